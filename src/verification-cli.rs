//! A simple CLI tool for verifying anonymous-vote tokens offline.
//! This uses the internal server verification implementation, and is by
//! definition compatible with tokens issued by our API endpoints.

use std::fs;

use clap::{Arg, ArgAction, ArgMatches, Command};
use ed25519_dalek::{pkcs8::DecodePublicKey, VerifyingKey};

use votaciones_backend::crypto::token::{verify_token, VerificationResult};

const PROGRAM_NAME: &str = "verify-voto";

const ABOUT_TEXT: &str = "Verify the integrity of an anonymous-vote token.

EXIT CODES:
     0: The token is authentic.
   255: Ran successfully, but the token is invalid.
 Other: Error.";

const PUBLIC_KEY_PATH: &str = "PUBLIC_KEY_PATH";

const PUBLIC_KEY_PATH_HELP: &str = "The path to the PEM public key,\n\
as published by `GET /tokens/public-key`";

const TOKEN: &str = "TOKEN";

const TOKEN_HELP: &str = "The token string from a vote receipt";

/// Construct the CLI configuration.
fn cli() -> Command {
    // Make the build dirty when the toml changes.
    include_str!("../Cargo.toml");

    clap::command!(PROGRAM_NAME)
        .about(ABOUT_TEXT)
        .arg(
            Arg::new(PUBLIC_KEY_PATH)
                .help(PUBLIC_KEY_PATH_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
        .arg(
            Arg::new(TOKEN)
                .help(TOKEN_HELP)
                .action(ArgAction::Set)
                .required(true),
        )
}

/// Errors that this program may produce.
#[derive(Debug, Eq, PartialEq)]
enum Error {
    /// IO error described by the inner message.
    IO(String),
    /// The public key file is not a valid Ed25519 PEM.
    Key(String),
}

/// Run verification.
fn verify(key_path: &str, token: &str) -> Result<VerificationResult, Error> {
    let pem = fs::read_to_string(key_path).map_err(|e| Error::IO(e.to_string()))?;
    let public_key =
        VerifyingKey::from_public_key_pem(&pem).map_err(|e| Error::Key(e.to_string()))?;

    Ok(verify_token(&public_key, token))
}

/// Run verification, report the result, and return the exit code.
fn run(args: &ArgMatches) -> u8 {
    // Required arguments are guaranteed to be present.
    let key_path: &String = args.get_one(PUBLIC_KEY_PATH).unwrap();
    let token: &String = args.get_one(TOKEN).unwrap();
    match verify(key_path, token) {
        Ok(result) if result.is_valid => {
            println!("Verification succeeded.");
            // Unwrap safe: a valid result always carries the vote data.
            let vote_data = result.vote_data.unwrap();
            println!("Votación: {}", vote_data.votacion_id);
            println!("Cast at:  {}", vote_data.timestamp);
            for (field, answer) in &vote_data.respuestas {
                println!("  {field}: {answer}");
            }
            0
        }
        Ok(result) => {
            // Unwrap safe: an invalid result always carries an error.
            println!("Verification failed: {}.", result.error.unwrap());
            if !result.hash_valid {
                println!("The embedded content hash does not match the payload (tampering).");
            }
            if !result.signature_valid {
                println!("The signature does not verify under the given public key (forgery).");
            }
            255
        }
        Err(Error::IO(msg)) => {
            println!("IO error: {}", msg);
            1
        }
        Err(Error::Key(msg)) => {
            println!("Invalid public key: {}", msg);
            1
        }
    }
}

fn main() {
    let args = cli().get_matches();
    let exit_code = run(&args);
    std::process::exit(exit_code.into())
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::{json, Value};

    use votaciones_backend::crypto::{keys::KeyStore, token::generate_signed_token};

    use super::*;

    fn key_and_token() -> (tempfile::TempDir, String, String) {
        let keys = KeyStore::generate();
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("public_key.pem");
        fs::write(&key_path, keys.public_key_pem()).unwrap();

        let Value::Object(respuestas) = json!({"q1": "yes"}) else {
            unreachable!()
        };
        let token = generate_signed_token(&keys, 42, respuestas, Utc::now()).unwrap();

        (dir, key_path.to_string_lossy().into_owned(), token)
    }

    #[test]
    fn verification() {
        let (_dir, key_path, token) = key_and_token();

        let result = verify(&key_path, &token).unwrap();
        assert!(result.is_valid);

        // Garbage token: runs fine, reports invalid.
        let result = verify(&key_path, "not-a-token").unwrap();
        assert!(!result.is_valid);

        // Missing key file.
        assert!(matches!(verify("no such file", &token), Err(Error::IO(_))));

        // Corrupt key file.
        let dir = tempfile::tempdir().unwrap();
        let bad_key = dir.path().join("bad.pem");
        fs::write(&bad_key, "not a pem").unwrap();
        assert!(matches!(
            verify(&bad_key.to_string_lossy(), &token),
            Err(Error::Key(_))
        ));
    }

    #[test]
    fn correct_cli_usage() {
        let (_dir, key_path, token) = key_and_token();

        let command_line = [PROGRAM_NAME, &key_path, &token];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 0);

        let command_line = [PROGRAM_NAME, &key_path, "not-a-token"];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 255);

        let command_line = [PROGRAM_NAME, "not a real file", &token];
        let args = cli().try_get_matches_from(command_line).unwrap();
        assert_eq!(run(&args), 1);
    }

    #[test]
    fn bad_cli_usage() {
        // Something very wrong.
        let command_line = [PROGRAM_NAME, "this", "invocation", "is", "incorrect"];
        cli().try_get_matches_from(command_line).unwrap_err();

        // No options at all.
        let command_line = [PROGRAM_NAME];
        cli().try_get_matches_from(command_line).unwrap_err();
    }
}
