use redis_emu::protocol::RespValue;
use redis_emu::Client;
use std::collections::HashSet;

#[tokio::test]
async fn hset_hget_round_trip() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("HSET", ["h", "field", "value"]).await, RespValue::Integer(1));
    assert_eq!(client.execute("HGET", ["h", "field"]).await, RespValue::BulkString("value".into()));
}

#[tokio::test]
async fn hdel_reports_how_many_fields_were_removed() {
    let mut client = Client::new_isolated();
    client.execute("HSET", ["h", "a", "1", "b", "2"]).await;
    assert_eq!(client.execute("HDEL", ["h", "a", "missing"]).await, RespValue::Integer(1));
}

#[tokio::test]
async fn sadd_is_idempotent_for_duplicate_members() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("SADD", ["s", "a", "b"]).await, RespValue::Integer(2));
    assert_eq!(client.execute("SADD", ["s", "a"]).await, RespValue::Integer(0));
    assert_eq!(client.execute("SCARD", ["s"]).await, RespValue::Integer(2));
}

#[tokio::test]
async fn smembers_returns_every_member_regardless_of_order() {
    let mut client = Client::new_isolated();
    client.execute("SADD", ["s", "a", "b", "c"]).await;
    let reply = client.execute("SMEMBERS", ["s"]).await;
    let RespValue::Array(items) = reply else { panic!("expected an array reply") };
    let got: HashSet<Vec<u8>> = items
        .into_iter()
        .map(|v| match v {
            RespValue::BulkString(b) => b.to_vec(),
            other => panic!("expected bulk strings in set, got {other:?}"),
        })
        .collect();
    assert_eq!(got, HashSet::from([b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]));
}

#[tokio::test]
async fn zadd_then_zscore_reports_the_stored_score() {
    let mut client = Client::new_isolated();
    client.execute("ZADD", ["z", "1.5", "alice"]).await;
    assert_eq!(client.execute("ZSCORE", ["z", "alice"]).await, RespValue::BulkString("1.5".into()));
}

#[tokio::test]
async fn type_of_reports_the_stored_value_kind() {
    let mut client = Client::new_isolated();
    client.execute("RPUSH", ["l", "a"]).await;
    assert_eq!(client.execute("TYPE", ["l"]).await, RespValue::SimpleString("list".to_string()));
}
