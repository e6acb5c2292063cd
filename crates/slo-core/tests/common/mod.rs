pub mod swift_server;
