// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `uxa` subcommands: `login`, `logout`, `whoami`, `request`.

use reqwest::Method;

use crate::client::{HttpClient, LoginRequest};
use crate::error::ClientError;
use crate::transport::ApiRequest;

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Log in and store the session.
    Login(LoginArgs),
    /// Discard the stored session.
    Logout,
    /// Show the logged-in user.
    Whoami,
    /// Send one request through the authenticated client.
    Request(RequestArgs),
}

#[derive(Debug, clap::Args)]
pub struct LoginArgs {
    /// Account email.
    #[arg(long)]
    pub email: String,
    /// Account password.
    #[arg(long, env = "UXA_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Debug, clap::Args)]
pub struct RequestArgs {
    /// HTTP method (GET, POST, PUT, PATCH, DELETE).
    #[arg(value_parser = parse_method)]
    pub method: Method,
    /// Path relative to the base URL (e.g. /projects).
    pub path: String,
    /// JSON request body.
    #[arg(long)]
    pub data: Option<String>,
    /// Send without the access token.
    #[arg(long)]
    pub public: bool,
}

pub fn parse_method(s: &str) -> Result<Method, String> {
    Method::from_bytes(s.to_uppercase().as_bytes()).map_err(|_| format!("invalid method: {s}"))
}

/// Run a subcommand. Returns a process exit code.
pub async fn run(command: &Command, client: &HttpClient) -> i32 {
    match command {
        Command::Login(args) => cmd_login(client, args).await,
        Command::Logout => cmd_logout(client),
        Command::Whoami => cmd_whoami(client),
        Command::Request(args) => cmd_request(client, args).await,
    }
}

async fn cmd_login(client: &HttpClient, args: &LoginArgs) -> i32 {
    let credentials = LoginRequest { email: args.email.clone(), password: args.password.clone() };
    match client.login(&credentials).await {
        Ok(user) => {
            println!("Logged in as {}.", user.name.as_deref().unwrap_or(&user.email));
            0
        }
        Err(e) => report(&e),
    }
}

fn cmd_logout(client: &HttpClient) -> i32 {
    client.logout(Some("logout requested".to_owned()));
    println!("Logged out.");
    0
}

fn cmd_whoami(client: &HttpClient) -> i32 {
    if !client.is_authenticated() {
        eprintln!("Not logged in. Run `uxa login`.");
        return 3;
    }
    match client.identity() {
        Some(user) => {
            println!("{:<8} {}", "ID", user.id);
            println!("{:<8} {}", "EMAIL", user.email);
            if let Some(name) = user.name {
                println!("{:<8} {}", "NAME", name);
            }
            if let Some(role) = user.role {
                println!("{:<8} {}", "ROLE", role);
            }
        }
        None => println!("Logged in (no cached identity)."),
    }
    0
}

async fn cmd_request(client: &HttpClient, args: &RequestArgs) -> i32 {
    let mut request = ApiRequest::new(args.method.clone(), args.path.as_str());
    if let Some(ref data) = args.data {
        match serde_json::from_str::<serde_json::Value>(data) {
            Ok(body) => request = request.json(&body),
            Err(e) => {
                eprintln!("error: --data is not valid JSON: {e}");
                return 2;
            }
        }
    }
    if args.public {
        request = request.public();
    }

    match client.send(request).await {
        Ok(resp) => {
            let text = resp.text();
            // Pretty-print JSON bodies, raw text otherwise.
            match serde_json::from_str::<serde_json::Value>(&text) {
                Ok(value) => {
                    println!("{}", serde_json::to_string_pretty(&value).unwrap_or(text));
                }
                Err(_) => println!("{text}"),
            }
            if resp.is_success() {
                0
            } else {
                eprintln!("status: {}", resp.status);
                1
            }
        }
        Err(e) => report(&e),
    }
}

fn report(err: &ClientError) -> i32 {
    if err.is_session_expired() {
        eprintln!("Session expired. Run `uxa login` to sign in again.");
    }
    eprintln!("error [{}]: {err}", err.kind());
    err.kind().exit_code()
}

#[cfg(test)]
#[path = "command_tests.rs"]
mod tests;
