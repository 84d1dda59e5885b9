use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn set_and_get_round_trip() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("SET", ["k", "v"]).await, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("v".into()));
}

#[tokio::test]
async fn get_missing_key_is_null() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("GET", ["missing"]).await, RespValue::Null);
}

#[tokio::test]
async fn incr_on_fresh_key_starts_at_one() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("INCR", ["counter"]).await, RespValue::Integer(1));
    assert_eq!(client.execute("INCR", ["counter"]).await, RespValue::Integer(2));
}

#[tokio::test]
async fn incr_on_non_numeric_value_is_an_error() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "not-a-number"]).await;
    let reply = client.execute("INCR", ["k"]).await;
    assert!(matches!(reply, RespValue::Error(_)));
}

#[tokio::test]
async fn append_extends_the_string_and_reports_new_length() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "Hello"]).await;
    assert_eq!(client.execute("APPEND", ["k", " World"]).await, RespValue::Integer(11));
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("Hello World".into()));
}

#[tokio::test]
async fn expire_then_ttl_reflects_remaining_seconds() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "v"]).await;
    assert_eq!(client.execute("EXPIRE", ["k", "100"]).await, RespValue::Integer(1));
    let reply = client.execute("TTL", ["k"]).await;
    match reply {
        RespValue::Integer(ttl) => assert!(ttl > 0 && ttl <= 100),
        other => panic!("expected an integer TTL, got {other:?}"),
    }
}

#[tokio::test]
async fn set_ifeq_only_writes_when_the_stored_value_matches() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "old"]).await;

    let reply = client.execute("SET", ["k", "new", "IFEQ", "wrong"]).await;
    assert_eq!(reply, RespValue::Null);
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("old".into()));

    let reply = client.execute("SET", ["k", "new", "IFEQ", "old"]).await;
    assert_eq!(reply, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("new".into()));
}

#[tokio::test]
async fn set_ifgt_only_writes_when_the_new_score_is_greater() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "5"]).await;

    assert_eq!(client.execute("SET", ["k", "10", "IFGT", "3"]).await, RespValue::Null);
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("5".into()));

    assert_eq!(client.execute("SET", ["k", "10", "IFGT", "5"]).await, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("10".into()));
}

#[tokio::test]
async fn set_iflt_only_writes_when_the_new_score_is_lesser() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "5"]).await;

    assert_eq!(client.execute("SET", ["k", "10", "IFLT", "3"]).await, RespValue::Null);
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("5".into()));

    assert_eq!(client.execute("SET", ["k", "1", "IFLT", "5"]).await, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::BulkString("1".into()));
}

#[tokio::test]
async fn set_ifgt_fails_against_a_missing_key_like_xx() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("SET", ["missing", "1", "IFGT", "0"]).await, RespValue::Null);
    assert_eq!(client.execute("GET", ["missing"]).await, RespValue::Null);
}

#[tokio::test]
async fn persist_removes_an_existing_expiration() {
    let mut client = Client::new_isolated();
    client.execute("SET", ["k", "v"]).await;
    client.execute("EXPIRE", ["k", "100"]).await;
    assert_eq!(client.execute("PERSIST", ["k"]).await, RespValue::Integer(1));
    assert_eq!(client.execute("TTL", ["k"]).await, RespValue::Integer(-1));
}
