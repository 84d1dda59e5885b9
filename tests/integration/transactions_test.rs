use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn queued_commands_run_in_order_on_exec() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("MULTI", Vec::<&str>::new()).await, RespValue::ok());
    assert_eq!(client.execute("SET", ["k", "v"]).await, RespValue::SimpleString("QUEUED".to_string()));
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::SimpleString("QUEUED".to_string()));
    let reply = client.execute("EXEC", Vec::<&str>::new()).await;
    assert_eq!(reply, RespValue::Array(vec![RespValue::ok(), RespValue::BulkString("v".into())]));
}

#[tokio::test]
async fn discard_drops_queued_commands_without_running_them() {
    let mut client = Client::new_isolated();
    client.execute("MULTI", Vec::<&str>::new()).await;
    client.execute("SET", ["k", "v"]).await;
    assert_eq!(client.execute("DISCARD", Vec::<&str>::new()).await, RespValue::ok());
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::Null);
}

#[tokio::test]
async fn exec_aborts_with_nil_array_when_a_watched_key_changed() {
    let server = redis_emu::Server::default();
    let mut watcher = Client::new(&server);
    let mut other = Client::new(&server);

    watcher.execute("SET", ["k", "v1"]).await;
    watcher.execute("WATCH", ["k"]).await;
    watcher.execute("MULTI", Vec::<&str>::new()).await;
    watcher.execute("GET", ["k"]).await;

    other.execute("SET", ["k", "v2"]).await;

    let reply = watcher.execute("EXEC", Vec::<&str>::new()).await;
    assert_eq!(reply, RespValue::NullArray);
}

#[tokio::test]
async fn exec_without_multi_is_an_error() {
    let mut client = Client::new_isolated();
    let reply = client.execute("EXEC", Vec::<&str>::new()).await;
    assert!(matches!(reply, RespValue::Error(_)));
}
