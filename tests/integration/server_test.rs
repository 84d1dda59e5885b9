use redis_emu::dispatch::{self, NewSubscription};
use redis_emu::protocol::RespValue;
use redis_emu::server::clock::ManualClock;
use redis_emu::{Client, Server};
use std::sync::Arc;

#[tokio::test]
async fn a_manual_clock_drives_expiration_deterministically() {
    let server = Server::default();
    let clock = Arc::new(ManualClock::new(1_000));
    server.set_clock(clock.clone());

    let mut client = Client::new(&server);
    client.execute("SET", ["k", "v"]).await;
    client.execute("PEXPIRE", ["k", "500"]).await;

    clock.advance(600);
    assert_eq!(client.execute("GET", ["k"]).await, RespValue::Null);
}

#[tokio::test]
async fn a_lazily_expired_key_fires_the_same_notification_as_active_expiry() {
    let server = Server::default();
    let clock = Arc::new(ManualClock::new(1_000));
    server.set_clock(clock.clone());

    let mut actor = Client::new(&server);
    actor.execute("CONFIG", ["SET", "notify-keyspace-events", "Ex"]).await;
    actor.execute("SET", ["k", "v"]).await;
    actor.execute("PEXPIRE", ["k", "500"]).await;

    let mut subscriber = Client::new(&server);
    let command = dispatch::parse("SUBSCRIBE", vec!["__keyevent@0__:expired".into()]).unwrap();
    let dispatched = subscriber.execute_command_raw(command).await;
    let NewSubscription::Channel(_, mut rx) = dispatched.new_subscriptions.into_iter().next().unwrap() else {
        panic!("expected a channel subscription")
    };

    clock.advance(600);
    assert_eq!(actor.execute("GET", ["k"]).await, RespValue::Null);

    let payload = rx.recv().await.unwrap();
    assert_eq!(payload, "k".as_bytes());
}

#[tokio::test]
async fn disconnected_server_refuses_commands() {
    let server = Server::default();
    server.set_connected(false);
    let mut client = Client::new(&server);
    let reply = client.execute("PING", Vec::<&str>::new()).await;
    assert!(matches!(reply, RespValue::Error(_)));
}

#[tokio::test]
async fn flush_all_clears_every_database() {
    let server = Server::default();
    server.seed_string("preexisting", "value").await;
    let mut client = Client::new(&server);
    assert_eq!(client.execute("GET", ["preexisting"]).await, RespValue::BulkString("value".into()));

    server.flush_all().await;
    assert_eq!(client.execute("GET", ["preexisting"]).await, RespValue::Null);
}

#[tokio::test]
async fn two_clients_against_one_server_see_each_others_writes() {
    let server = Server::default();
    let mut a = Client::new(&server);
    let mut b = Client::new(&server);

    a.execute("SET", ["shared", "from-a"]).await;
    assert_eq!(b.execute("GET", ["shared"]).await, RespValue::BulkString("from-a".into()));
}

#[tokio::test]
async fn an_isolated_client_does_not_see_writes_from_another_server() {
    let server = Server::default();
    let mut on_server = Client::new(&server);
    let mut isolated = Client::new_isolated();

    on_server.execute("SET", ["k", "v"]).await;
    assert_eq!(isolated.execute("GET", ["k"]).await, RespValue::Null);
}
