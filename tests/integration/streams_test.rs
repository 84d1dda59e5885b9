use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn xadd_then_xrange_returns_the_appended_entry() {
    let mut client = Client::new_isolated();
    let RespValue::BulkString(id) = client.execute("XADD", ["stream", "*", "field", "value"]).await else {
        panic!("expected a bulk string id")
    };
    let reply = client.execute("XRANGE", ["stream", "-", "+"]).await;
    let RespValue::Array(entries) = reply else { panic!("expected an array reply") };
    assert_eq!(entries.len(), 1);
    let RespValue::Array(entry) = &entries[0] else { panic!("expected an entry array") };
    assert_eq!(entry[0], RespValue::BulkString(id));
}

#[tokio::test]
async fn xread_block_wakes_up_once_another_client_adds_an_entry() {
    let server = redis_emu::Server::default();
    let mut reader = Client::new(&server);
    let mut writer = Client::new(&server);

    let blocked = tokio::spawn(async move { reader.execute("XREAD", ["BLOCK", "0", "STREAMS", "stream", "0"]).await });

    // Give the blocking client a chance to register its waiter first.
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    writer.execute("XADD", ["stream", "*", "field", "value"]).await;

    let reply = blocked.await.unwrap();
    let RespValue::Array(streams) = reply else { panic!("expected an array reply, got {reply:?}") };
    assert_eq!(streams.len(), 1);
    let RespValue::Array(stream) = &streams[0] else { panic!("expected a [name, entries] pair") };
    assert_eq!(stream[0], RespValue::BulkString("stream".into()));
}
