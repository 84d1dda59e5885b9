use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn dump_then_restore_recreates_a_string() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "v"]).await;
    let dumped = client.execute("DUMP", ["k"]).await;
    let RespValue::BulkString(payload) = dumped else { panic!("expected a bulk string payload") };

    client.execute("DEL", ["k"]).await;
    let reply = client.execute_args(vec!["RESTORE".into(), "k".into(), "0".into(), payload]).await;
    assert_eq!(reply, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("v".into()));
}

#[tokio::test]
async fn dump_then_restore_recreates_a_sorted_set() {
    let mut client = Client::new_isolated();
    client.execute("ZADD", ["z", "1", "a", "2", "b"]).await;
    let dumped = client.execute("DUMP", ["z"]).await;
    let RespValue::BulkString(payload) = dumped else { panic!("expected a bulk string payload") };

    let reply = client
        .execute_args(vec!["RESTORE".into(), "z2".into(), "0".into(), payload])
        .await;
    assert_eq!(reply, RespValue::ok());
    assert_eq!(client.execute("ZSCORE", ["z2", "a"]).await, RespValue::BulkString("1".into()));
    assert_eq!(client.execute("ZSCORE", ["z2", "b"]).await, RespValue::BulkString("2".into()));
}

#[tokio::test]
async fn restore_refuses_to_overwrite_an_existing_key_without_replace() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "original"]).await;
    let dumped = client.execute("DUMP", ["k"]).await;
    let RespValue::BulkString(payload) = dumped else { panic!("expected a bulk string payload") };

    let reply = client.execute_args(vec!["RESTORE".into(), "k".into(), "0".into(), payload]).await;
    assert!(matches!(reply, RespValue::Error(_)));
}

#[tokio::test]
async fn restore_rejects_a_corrupted_payload() {
    let mut client = Client::new_isolated();
    let reply = client
        .execute_args(vec!["RESTORE".into(), "k".into(), "0".into(), "not-a-real-payload".into()])
        .await;
    assert!(matches!(reply, RespValue::Error(_)));
}
