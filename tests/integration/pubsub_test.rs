use redis_emu::dispatch::{self, NewSubscription};
use redis_emu::protocol::RespValue;
use redis_emu::Client;

#[tokio::test]
async fn publish_reports_the_number_of_subscribers_reached() {
    let server = redis_emu::Server::default();
    let mut subscriber = Client::new(&server);
    let mut publisher = Client::new(&server);

    let command = dispatch::parse("SUBSCRIBE", vec!["news".into()]).unwrap();
    let dispatched = subscriber.execute_command_raw(command).await;
    assert_eq!(dispatched.new_subscriptions.len(), 1);

    let reply = publisher.execute("PUBLISH", ["news", "hello"]).await;
    assert_eq!(reply, RespValue::Integer(1));
}

#[tokio::test]
async fn a_published_message_arrives_on_the_subscriber_receiver() {
    let server = redis_emu::Server::default();
    let mut subscriber = Client::new(&server);
    let mut publisher = Client::new(&server);

    let command = dispatch::parse("SUBSCRIBE", vec!["news".into()]).unwrap();
    let dispatched = subscriber.execute_command_raw(command).await;
    let NewSubscription::Channel(name, mut rx) = dispatched.new_subscriptions.into_iter().next().unwrap() else {
        panic!("expected a channel subscription")
    };
    assert_eq!(name, "news".as_bytes());

    publisher.execute("PUBLISH", ["news", "hello"]).await;
    let payload = rx.recv().await.unwrap();
    assert_eq!(payload, "hello".as_bytes());
}

#[tokio::test]
async fn publish_with_no_subscribers_reports_zero() {
    let mut client = Client::new_isolated();
    assert_eq!(client.execute("PUBLISH", ["nobody-listening", "msg"]).await, RespValue::Integer(0));
}
