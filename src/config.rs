//! This module holds the configuration for the server

use std::net::IpAddr;

use actix_toolbox::logging::LoggingConfig;
use serde::{Deserialize, Serialize};

/// Configuration regarding the server
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct ServerConfig {
    /// The address the server should bind to
    pub listen_address: IpAddr,
    /// The port the server should bind to
    pub listen_port: u16,
    /// Base64 encoded secret key for session cookies.
    ///
    /// Must decode to at least 64 bytes. Use the `gen-key` subcommand
    /// to generate a fresh one.
    pub secret_key: String,
}

/// Configuration regarding the database
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct DBConfig {
    /// Host the database is running on
    pub host: String,
    /// Port the database is running on
    pub port: u16,
    /// Name of the database
    pub name: String,
    /// User to access the database with
    pub user: String,
    /// Password to access the database with
    pub password: String,
}

/// This struct can be parsed from the configuration file
#[derive(Deserialize, Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    /// Configuration regarding the server
    pub server: ServerConfig,
    /// Configuration regarding the database
    pub database: DBConfig,
    /// The logging configuration
    pub logging: LoggingConfig,
}
