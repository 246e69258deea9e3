use std::io::{self, IsTerminal, Read, Write};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use derive256::{
    derive_key_pair, seed_from_input, DerivationPath, ExtendedKey, Mnemonic, MnemonicLen, Network,
    DEFAULT_PATH,
};

/// Derive a secp256k1 key pair from a BIP-39 mnemonic
#[derive(Parser)]
#[command(name = "derive256")]
#[command(version)]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    /// The logging level
    #[arg(
        long,
        global = true,
        default_value = "warn",
        value_parser = ["trace", "debug", "info", "warn", "error"]
    )]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    derive: DeriveArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Derive the key pair at a path (default command)
    Derive(DeriveArgs),

    /// Print a fresh random mnemonic
    Generate {
        /// Number of words (12, 15, 18, 21 or 24)
        #[arg(long, default_value = "24")]
        words: usize,
    },
}

#[derive(Args)]
struct DeriveArgs {
    /// Mnemonic phrase; read from stdin when absent
    #[arg(long, env = "DERIVE256_MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    /// Optional BIP-39 passphrase
    #[arg(long, env = "DERIVE256_PASSPHRASE", hide_env_values = true, default_value = "")]
    passphrase: String,

    /// Derivation path
    #[arg(long, default_value = DEFAULT_PATH)]
    path: DerivationPath,

    /// Hash the phrase without checking word count, words or checksum.
    /// Needed for phrases that are not valid BIP-39, e.g. 13 words.
    #[arg(long)]
    no_validate: bool,

    /// Use testnet versions for extended keys and address
    #[arg(long)]
    testnet: bool,

    /// Also print xprv, xpub and the P2PKH address
    #[arg(long)]
    extended: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    let mut stdout = io::stdout().lock();
    match cli.command {
        Some(Commands::Derive(args)) => cmd_derive(args, &mut stdout),
        Some(Commands::Generate { words }) => cmd_generate(words, &mut stdout),
        None => cmd_derive(cli.derive, &mut stdout),
    }
}

fn init_tracing(log_level: &str) {
    let level = match log_level {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn cmd_derive(args: DeriveArgs, out: &mut impl Write) -> Result<()> {
    let phrase = match args.mnemonic {
        Some(phrase) => Zeroizing::new(phrase),
        None => {
            let mut stdin = io::stdin();
            if stdin.is_terminal() {
                eprintln!("Enter mnemonic phrase:");
            }
            read_phrase(&mut stdin)?
        }
    };
    let passphrase = Zeroizing::new(args.passphrase);

    let seed = seed_from_input(&phrase, &passphrase, !args.no_validate)
        .context("failed to convert mnemonic to seed")?;
    let key = derive_key_pair(&seed, &args.path)
        .with_context(|| format!("failed to derive key at {}", args.path))?;

    let network = if args.testnet { Network::Testnet } else { Network::Bitcoin };
    write_key_pair(out, &key, args.extended, network)
}

fn write_key_pair(
    out: &mut impl Write,
    key: &ExtendedKey,
    extended: bool,
    network: Network,
) -> Result<()> {
    let private_key = Zeroizing::new(key.private_key_hex());
    writeln!(out, "Private Key (secp256k1): {}", private_key.as_str())?;
    writeln!(out, "Public Key (secp256k1): {}", key.public_key_hex()?)?;

    if extended {
        let xprv = Zeroizing::new(key.to_xprv(network));
        writeln!(out, "Extended Private Key: {}", xprv.as_str())?;
        writeln!(out, "Extended Public Key: {}", key.to_xpub(network)?)?;
        writeln!(out, "Address (P2PKH): {}", key.address(network)?)?;
    }

    Ok(())
}

fn cmd_generate(words: usize, out: &mut impl Write) -> Result<()> {
    let mnemonic = Mnemonic::new(MnemonicLen::from_word_count(words)?)?;
    writeln!(out, "{}", mnemonic.phrase())?;
    Ok(())
}

fn read_phrase(input: &mut impl Read) -> Result<Zeroizing<String>> {
    let mut phrase = Zeroizing::new(String::new());
    input
        .read_to_string(&mut phrase)
        .context("failed to read mnemonic from stdin")?;
    if phrase.trim().is_empty() {
        bail!("no mnemonic given (use --mnemonic, DERIVE256_MNEMONIC or stdin)");
    }
    Ok(phrase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn derive_output(args: &[&str]) -> String {
        let mut argv = vec!["derive256", "--mnemonic", ABANDON_ABOUT];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        let mut out = Vec::new();
        cmd_derive(cli.derive, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn prints_two_key_lines() {
        let output = derive_output(&[]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let private = lines[0].strip_prefix("Private Key (secp256k1): ").unwrap();
        assert_eq!(private.len(), 64);
        assert!(private.bytes().all(|b| b.is_ascii_hexdigit()));

        let public = lines[1].strip_prefix("Public Key (secp256k1): ").unwrap();
        assert_eq!(public.len(), 66);
        assert!(public.starts_with("02") || public.starts_with("03"));
    }

    #[test]
    fn extended_output() {
        let output = derive_output(&["--extended"]);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(lines[2].starts_with("Extended Private Key: xprv"));
        assert!(lines[3].starts_with("Extended Public Key: xpub"));
        assert_eq!(lines[4], "Address (P2PKH): 1LqBGSKuX5yYUonjxT5qGfpUsXKYYWeabA");

        let testnet = derive_output(&["--extended", "--testnet"]);
        assert!(testnet.contains("Extended Private Key: tprv"));
    }

    #[test]
    fn thirteen_words_need_no_validate() {
        let phrase = "abandon abandon ability able about above absent absorb abstract absurd abuse access accident";
        let cli = Cli::try_parse_from(["derive256", "--mnemonic", phrase]).unwrap();
        assert!(cmd_derive(cli.derive, &mut Vec::new()).is_err());

        let cli = Cli::try_parse_from(["derive256", "--mnemonic", phrase, "--no-validate"]).unwrap();
        let mut out = Vec::new();
        cmd_derive(cli.derive, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 2);
    }

    #[test]
    fn generate_prints_phrase() {
        let mut out = Vec::new();
        cmd_generate(12, &mut out).unwrap();
        let phrase = String::from_utf8(out).unwrap();
        assert_eq!(Mnemonic::from_phrase(&phrase).unwrap().word_count(), 12);

        assert!(cmd_generate(13, &mut Vec::new()).is_err());
    }

    #[test]
    fn reads_phrase_from_input() {
        let input = format!("{ABANDON_ABOUT}\n");
        let phrase = read_phrase(&mut input.as_bytes()).unwrap();
        assert_eq!(phrase.trim(), ABANDON_ABOUT);

        assert!(read_phrase(&mut "  \n".as_bytes()).is_err());
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["derive256", "--log-level", "loud"]).is_err());
        assert!(Cli::try_parse_from(["derive256", "--log-level", "debug"]).is_ok());
    }

    #[test]
    fn parses_subcommands() {
        let cli = Cli::try_parse_from(["derive256", "generate", "--words", "18"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Generate { words: 18 })));

        let cli = Cli::try_parse_from(["derive256", "derive", "--path", "m/0'/1"]).unwrap();
        match cli.command {
            Some(Commands::Derive(args)) => assert_eq!(args.path.to_string(), "m/0'/1"),
            _ => panic!("expected derive"),
        }
    }
}
