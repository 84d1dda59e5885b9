use super::support::init_tracing;
use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn client_setname_is_reflected_in_client_list() {
    init_tracing();
    let mut client = Client::new_isolated();
    client.execute("CLIENT", ["SETNAME", "worker-1"]).await;

    let RespValue::BulkString(listing) = client.execute("CLIENT", ["LIST"]).await else {
        panic!("expected a bulk string reply")
    };
    let listing = String::from_utf8_lossy(&listing);
    assert!(listing.contains("name=worker-1"), "listing was: {listing}");
}

#[tokio::test]
async fn select_is_reflected_in_client_list_db_field() {
    let mut client = Client::new_isolated();
    client.execute("SELECT", ["1"]).await;

    let RespValue::BulkString(listing) = client.execute("CLIENT", ["LIST"]).await else {
        panic!("expected a bulk string reply")
    };
    let listing = String::from_utf8_lossy(&listing);
    assert!(listing.contains("db=1"), "listing was: {listing}");
}

#[tokio::test]
async fn config_set_then_get_round_trips_a_parameter() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("CONFIG", ["SET", "maxmemory", "1024"]).await, RespValue::ok());
    let reply = client.execute("CONFIG", ["GET", "maxmemory"]).await;
    assert_eq!(
        reply,
        RespValue::Array(vec![RespValue::BulkString("maxmemory".into()), RespValue::BulkString("1024".into())])
    );
}

#[tokio::test]
async fn config_set_rejects_an_unknown_parameter() {
    let mut client = Client::new_isolated();
    let reply = client.execute("CONFIG", ["SET", "not-a-real-option", "1"]).await;
    assert!(matches!(reply, RespValue::Error(_)));
}
