use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn rpush_then_lrange_preserves_order() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("RPUSH", ["list", "a", "b", "c"]).await, RespValue::Integer(3));
    let reply = client.execute("LRANGE", ["list", "0", "-1"]).await;
    assert_eq!(
        reply,
        RespValue::Array(vec![
            RespValue::BulkString("a".into()),
            RespValue::BulkString("b".into()),
            RespValue::BulkString("c".into()),
        ])
    );
}

#[tokio::test]
async fn lpop_returns_and_removes_the_head() {
    let mut client = Client::new_isolated();
    client.execute("RPUSH", ["list", "a", "b"]).await;
    assert_eq!(client.execute("LPOP", ["list"]).await, RespValue::BulkString("a".into()));
    assert_eq!(client.execute("LLEN", ["list"]).await, RespValue::Integer(1));
}

#[tokio::test]
async fn blpop_wakes_up_once_another_client_pushes() {
    let server = redis_emu::Server::default();
    let mut blocker = Client::new(&server);
    let mut pusher = Client::new(&server);

    let blocked = tokio::spawn(async move { blocker.execute("BLPOP", ["queue", "0"]).await });

    // Give the blocking client a chance to register its waiter first.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    pusher.execute("RPUSH", ["queue", "item"]).await;

    let reply = blocked.await.unwrap();
    assert_eq!(
        reply,
        RespValue::Array(vec![RespValue::BulkString("queue".into()), RespValue::BulkString("item".into())])
    );
}
