//! OMP Sign - key generation and signed requests for the OMP object server.
//!
//! ```text
//! omp-sign gen-key --keyid client-1
//! omp-sign post --host http://localhost:8080 --keyid client-1 --json '{"title":"hi"}'
//! ```

use anyhow::{Context, Result};
use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use clap::{Parser, Subcommand};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use reqwest::Url;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use omp_auth::keys::encode_public_key;
use omp_auth::{RequestSigner, RequestTarget};

#[derive(Debug, Parser)]
#[command(version, about = "Generate keys and send signed requests to an OMP server")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Generate an Ed25519 key pair and print server and client exports.
    GenKey {
        /// Key identifier to bind the public key to.
        #[arg(long, default_value = "client-1")]
        keyid: String,
    },
    /// Sign and send `POST <host><path>` with a JSON object body.
    Post {
        /// Server base URL.
        #[arg(long, default_value = "http://localhost:8080")]
        host: String,
        /// Request path.
        #[arg(long, default_value = "/objects")]
        path: String,
        /// Base64url-encoded 32-byte private key seed.
        #[arg(long, env = "SEED_B64U")]
        seed_b64u: String,
        /// Key identifier sent in `Signature-Input`.
        #[arg(long, env = "OMP_SIG_KEYID", default_value = "client-1")]
        keyid: String,
        /// Namespace of the stored object.
        #[arg(long, default_value = "default")]
        namespace: String,
        /// Object content as a JSON object.
        #[arg(long, default_value = "{}")]
        json: String,
        /// Signature lifetime in seconds.
        #[arg(long)]
        expires_in: Option<i64>,
    },
}

fn decode_seed(seed: &str) -> Result<SigningKey> {
    let bytes = URL_SAFE_NO_PAD
        .decode(seed.trim().trim_end_matches('='))
        .context("seed is not valid base64url")?;
    let seed: [u8; 32] = bytes
        .try_into()
        .map_err(|b: Vec<u8>| anyhow::anyhow!("seed must be 32 bytes, got {}", b.len()))?;
    Ok(SigningKey::from_bytes(&seed))
}

/// The request target a client addressing `url` signs.
fn target_for(method: &str, url: &Url) -> Result<RequestTarget> {
    let host = url.host_str().context("URL has no host")?;
    let authority = match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_owned(),
    };
    Ok(RequestTarget::new(
        method,
        url.scheme(),
        Some(authority),
        url.path(),
        url.query().map(ToOwned::to_owned),
    ))
}

fn gen_key(keyid: &str) {
    let key = SigningKey::generate(&mut OsRng);
    let public = encode_public_key(&key.verifying_key().to_bytes());
    let seed = URL_SAFE_NO_PAD.encode(key.to_bytes());

    println!("# server");
    println!("export OMP_SIG_MODE=strict");
    println!("export OMP_SIG_KEYID={keyid}");
    println!("export OMP_SIG_ED25519_PUB={public}");
    println!();
    println!("# client");
    println!("export OMP_SIG_KEYID={keyid}");
    println!("export SEED_B64U={seed}");
}

async fn post(
    host: &str,
    path: &str,
    seed: &str,
    keyid: &str,
    namespace: &str,
    json: &str,
    expires_in: Option<i64>,
) -> Result<()> {
    let content: serde_json::Value = serde_json::from_str(json).context("--json is not valid JSON")?;
    anyhow::ensure!(content.is_object(), "--json must be a JSON object");

    let url = Url::parse(host)
        .and_then(|base| base.join(path))
        .with_context(|| format!("invalid URL {host}{path}"))?;

    let mut signer = RequestSigner::new(keyid, decode_seed(seed)?);
    if let Some(seconds) = expires_in {
        signer = signer.with_expires_in(seconds);
    }
    let created = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .context("system clock is before the epoch")?
        .as_secs();
    let target = target_for("POST", &url)?;
    debug!(?target, "signing request");
    let signature = signer.sign(&target, i64::try_from(created)?)?;

    let mut headers = reqwest::header::HeaderMap::new();
    signature.insert_into(&mut headers)?;

    let response = reqwest::Client::new()
        .post(url)
        .headers(headers)
        .json(&serde_json::json!({"namespace": namespace, "content": content}))
        .send()
        .await
        .context("request failed")?;

    println!("{}", response.status());
    println!("{}", response.text().await.context("failed to read response body")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::GenKey { keyid } => {
            gen_key(&keyid);
            Ok(())
        }
        Command::Post {
            host,
            path,
            seed_b64u,
            keyid,
            namespace,
            json,
            expires_in,
        } => post(&host, &path, &seed_b64u, &keyid, &namespace, &json, expires_in).await,
    }
}
