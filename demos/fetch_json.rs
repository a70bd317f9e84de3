use fetchling::request;
use snafu::prelude::*;

#[snafu::report]
#[tokio::main]
pub async fn main() -> Result<(), snafu::Whatever> {
    let engine = reqwest::Client::new();

    let todo: serde_json::Value = request("https://jsonplaceholder.typicode.com")
        .whatever_context("Failed to parse URL")?
        .path(["todos", "1"])
        .query("verbose", true)
        .json(&engine)
        .await
        .whatever_context("Failed to fetch todo")?;

    println!("{todo:#}");

    Ok(())
}
