// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use log_transfer::config::TransferConfig;
use log_transfer::logger::install;
use log_transfer::TransferError;
use mockito::{Matcher, Server};
use std::env;

// installs the process-wide subscriber, so it lives alone in this binary
#[tokio::test]
async fn install_from_env_ships_on_shutdown() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/logs")
        .match_header("x-api-key", "secret")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex(r#""msg":"service ready""#.to_string()),
            Matcher::Regex(r#""service":"checkout""#.to_string()),
        ]))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    env::set_var("LOG_TRANSFER_URL", format!("{}/logs", server.url()));
    env::set_var("LOG_TRANSFER_API_KEY", "secret");
    env::set_var("LOG_TRANSFER_FLUSH_INTERVAL_MS", "3600000");
    env::set_var("LOG_TRANSFER_IDENTIFIER_FIELD", "service");
    env::set_var("LOG_TRANSFER_IDENTIFIER_VALUE", "checkout");
    env::set_var("LOG_TRANSFER_CONSOLE", "false");
    let config = TransferConfig::from_env().expect("config should load");

    let transfer = install(&config).expect("install failed");
    tracing::info!(port = 8080, "service ready");
    transfer.close().await.expect("close failed");
    mock.assert_async().await;

    // the default subscriber is already taken
    let err = install(&config).err();
    assert!(matches!(err, Some(TransferError::LoggerAlreadyInstalled)));
}
