//! wallcrypt: password-based file encryption CLI
//!
//! Usage:
//!   wallcrypt encrypt <INPUT> <OUTPUT>
//!   wallcrypt decrypt <INPUT> <OUTPUT>
//!
//! The passphrase is prompted interactively (with confirmation when
//! encrypting), or read from an environment variable via --passphrase-env
//! for scripted use.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use secrecy::SecretString;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser, Debug)]
#[command(
    name = "wallcrypt",
    version,
    about = "Password-based file encryption",
    long_about = "wallcrypt: encrypt and decrypt files with a passphrase.\n\
                  The format carries no integrity tag, so decrypting with the\n\
                  wrong passphrase is indistinguishable from a corrupted file."
)]
struct Cli {
    /// Read the passphrase from this environment variable instead of prompting
    #[arg(long, value_name = "VAR", global = true)]
    passphrase_env: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "WALLCRYPT_LOG", default_value = "warn")]
    log: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Encrypt a file with a passphrase
    Encrypt {
        /// Plaintext input path
        input: PathBuf,
        /// Encrypted output path (created, overwriting any existing file)
        output: PathBuf,
    },

    /// Decrypt a wallcrypt file
    Decrypt {
        /// Encrypted input path
        input: PathBuf,
        /// Plaintext output path (created, overwriting any existing file)
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log);

    match cli.command {
        Commands::Encrypt { input, output } => {
            let passphrase = acquire_passphrase(cli.passphrase_env.as_deref(), true)?;
            info!(input = %input.display(), output = %output.display(), "encrypting");

            let bytes = run_and_clean(&output, || {
                wallcrypt_codec::encrypt_file(&input, &output, &passphrase)
            })
            .with_context(|| format!("encrypting {}", input.display()))?;

            println!("Encrypted: {} → {}", input.display(), output.display());
            println!("  {} plaintext", fmt_bytes(bytes));
        }

        Commands::Decrypt { input, output } => {
            let passphrase = acquire_passphrase(cli.passphrase_env.as_deref(), false)?;
            info!(input = %input.display(), output = %output.display(), "decrypting");

            let bytes = run_and_clean(&output, || {
                wallcrypt_codec::decrypt_file(&input, &output, &passphrase)
            })
            .with_context(|| format!("decrypting {}", input.display()))?;

            println!("Decrypted: {} → {}", input.display(), output.display());
            println!("  {} recovered", fmt_bytes(bytes));
        }
    }

    Ok(())
}

/// Run a codec operation; on failure remove the partial destination file.
/// The codec performs no rollback itself, so the caller cleans up.
fn run_and_clean<F>(output: &Path, op: F) -> Result<u64, wallcrypt_codec::CodecError>
where
    F: FnOnce() -> Result<u64, wallcrypt_codec::CodecError>,
{
    op().inspect_err(|_| {
        let _ = std::fs::remove_file(output);
    })
}

fn acquire_passphrase(env_var: Option<&str>, confirm: bool) -> Result<SecretString> {
    if let Some(var) = env_var {
        let value = std::env::var(var)
            .with_context(|| format!("reading passphrase from ${var}"))?;
        if value.is_empty() {
            bail!("passphrase in ${var} is empty");
        }
        return Ok(SecretString::from(value));
    }

    let first = rpassword::prompt_password("Passphrase: ").context("reading passphrase")?;
    if first.is_empty() {
        bail!("passphrase must not be empty");
    }
    if confirm {
        let second = rpassword::prompt_password("Confirm passphrase: ")
            .context("reading passphrase confirmation")?;
        if first != second {
            bail!("passphrases do not match");
        }
    }
    Ok(SecretString::from(first))
}

fn init_logging(level: &str) {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .init();
}

fn fmt_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
