//! Consume a queue and echo every payload straight back.
//!
//! Run a RISP controller locally, then:
//!
//! ```sh
//! cargo run --example echo_worker
//! ```

use risq::{Client, Consume, Driver, Priority};

#[compio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut client = Client::default();
    client.add_controller("127.0.0.1:13555")?;
    client.consume(
        Consume::new("echo")
            .max(10)
            .priority(Priority::Normal)
            .on_accepted(|_outbox, queue, qid| {
                println!("consuming {queue} (qid {qid})");
            }),
        |_outbox, delivery| {
            if !delivery.is_noreply() {
                let payload = delivery.payload().to_vec();
                let _ = delivery.reply(payload);
            }
        },
    )?;

    let (driver, _handle) = Driver::new(client);
    driver.run().await;
    Ok(())
}
