//! Integration tests exercising the crate end-to-end through the in-process
//! `Client` API, against a real server instance.

mod integration {
    mod admin_test;
    mod dump_restore_test;
    mod hashes_and_sets_test;
    mod lists_test;
    mod pubsub_test;
    mod server_test;
    mod streams_test;
    pub(crate) mod support;
    mod strings_test;
    mod transactions_test;
}
