use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use tokio::io::{AsyncReadExt, stdin};
use tracing::{Level, debug, warn};
use vlock::bulk::{NeverPaused, Opened, OpenedArchive};
use vlock::config::{FILE_EXTENSION, PASSWORD_MIN_LENGTH};
use vlock::device::{DeviceClass, select_params};
use vlock::file::{File, collect_folder, safe_join};
use vlock::header::Argon2Params;
use vlock::processor::{Decrypted, Processor};
use vlock::secret::Secret;
use vlock::types::ProcessorMode;

use crate::ui::display::{print_banner, show_extracted, show_manifest, show_success, show_warning};
use crate::ui::progress::Bar;
use crate::ui::prompt::Prompt;

#[derive(Args)]
struct CostArgs {
    /// Preset to derive keys with.
    #[arg(long, default_value_t = DeviceClass::Desktop, value_parser = parse_device)]
    device: DeviceClass,

    /// Memory cost in KiB, overriding the preset.
    #[arg(long)]
    memory: Option<u32>,

    /// Iteration count, overriding the preset.
    #[arg(long)]
    iterations: Option<u32>,

    /// Lane count, overriding the preset.
    #[arg(long)]
    parallelism: Option<u32>,
}

impl CostArgs {
    fn params(&self) -> Result<Argon2Params> {
        let preset = select_params(self.device);
        let params = Argon2Params::new(
            self.memory.unwrap_or(preset.memory),
            self.iterations.unwrap_or(preset.iterations),
            self.parallelism.unwrap_or(preset.parallelism),
        );
        params.validate()?;
        debug!(device = %self.device, memory = params.memory, iterations = params.iterations, "selected key derivation costs");
        Ok(params)
    }
}

fn parse_device(value: &str) -> std::result::Result<DeviceClass, String> {
    DeviceClass::parse(value).ok_or_else(|| format!("unknown device class {value:?}, expected mobile or desktop"))
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a message into an inline text envelope.
    EncryptText {
        /// Message to encrypt; read from stdin when omitted.
        #[arg(short, long)]
        message: Option<String>,

        #[arg(short, long)]
        password: Option<String>,

        #[command(flatten)]
        cost: CostArgs,
    },

    /// Decrypt an inline text envelope.
    DecryptText {
        /// Envelope string; read from stdin when omitted.
        #[arg(short, long)]
        input: Option<String>,

        #[arg(short, long)]
        password: Option<String>,
    },

    /// Encrypt a file into a .vlock envelope.
    Encrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// MIME type stored with the payload; guessed from the extension when omitted.
        #[arg(long)]
        mime: Option<String>,

        #[arg(short, long)]
        password: Option<String>,

        /// Replace an existing output file.
        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        cost: CostArgs,
    },

    /// Decrypt an envelope of any generation.
    Decrypt {
        #[arg(short, long)]
        input: PathBuf,

        /// Where to write the payload. Text messages go to stdout when omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        force: bool,
    },

    /// Pack a folder into one bulk archive.
    BulkEncrypt {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        output: Option<PathBuf>,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        force: bool,

        #[command(flatten)]
        cost: CostArgs,
    },

    /// Show the manifest of a bulk archive.
    BulkList {
        #[arg(short, long)]
        input: PathBuf,

        #[arg(short, long)]
        password: Option<String>,
    },

    /// Extract a bulk archive, entirely or selected entries.
    BulkExtract {
        #[arg(short, long)]
        input: PathBuf,

        /// Output directory; defaults to the archive name without its extension.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Entry id (`file_001`) or path to extract. Repeatable.
        #[arg(long)]
        only: Vec<String>,

        #[arg(short, long)]
        password: Option<String>,

        #[arg(short, long)]
        force: bool,
    },

    /// Guided mode: pick an operation and a file from the current directory.
    Interactive,
}

#[derive(Parser)]
#[command(name = "vlock", version, about = "Password-based encryption for messages, files and folders.")]
pub struct App {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl App {
    pub fn init() -> Result<Self> {
        let app = Self::parse();
        let level = match app.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let subscriber = tracing_subscriber::fmt().with_max_level(level).with_writer(std::io::stderr).with_file(true).with_line_number(true).finish();
        tracing::subscriber::set_global_default(subscriber)?;
        Ok(app)
    }

    pub async fn execute(self) -> Result<()> {
        let prompt = Prompt::new(PASSWORD_MIN_LENGTH);

        match self.command {
            Some(Commands::EncryptText { message, password, cost }) => Self::encrypt_text(message, password, &cost, &prompt).await,
            Some(Commands::DecryptText { input, password }) => Self::decrypt_text(input, password, &prompt).await,
            Some(Commands::Encrypt { input, output, mime, password, force, cost }) => {
                let processor = processor(password, ProcessorMode::Encrypt, &prompt)?;
                let output = output.unwrap_or_else(|| File::new(&input).output_path(ProcessorMode::Encrypt));
                Self::encrypt_file(&processor, &File::new(input), &File::new(output), mime.as_deref(), cost.params()?, force).await
            }
            Some(Commands::Decrypt { input, output, password, force }) => {
                let processor = processor(password, ProcessorMode::Decrypt, &prompt)?;
                Self::decrypt_file(&processor, &File::new(input), output.map(File::new), force).await
            }
            Some(Commands::BulkEncrypt { input, output, password, force, cost }) => Self::bulk_encrypt(&input, output, password, force, &cost, &prompt).await,
            Some(Commands::BulkList { input, password }) => {
                let processor = processor(password, ProcessorMode::Decrypt, &prompt)?;
                let archive = File::new(input).read().await?;
                let opened = processor.decrypt_manifest(&archive).await.map_err(user_error)?;
                show_manifest(&opened.manifest);
                Ok(())
            }
            Some(Commands::BulkExtract { input, output, only, password, force }) => {
                let processor = processor(password, ProcessorMode::Decrypt, &prompt)?;
                let root = output.unwrap_or_else(|| default_extract_root(&input));
                let archive = File::new(input).read().await?;
                let opened = processor.decrypt_manifest(&archive).await.map_err(user_error)?;
                Self::bulk_extract(&processor, &archive, &opened, &root, &only, force).await
            }
            Some(Commands::Interactive) | None => Self::run_interactive(&prompt).await,
        }
    }

    async fn encrypt_text(message: Option<String>, password: Option<String>, cost: &CostArgs, prompt: &Prompt) -> Result<()> {
        let message = match message {
            Some(message) => message,
            None => read_stdin().await?,
        };
        let processor = processor(password, ProcessorMode::Encrypt, prompt)?;

        let envelope = match processor.encrypt_message_text(&message, cost.params()?).await {
            Err(err) if err.is_key_derivation() => {
                warn!(error = %err, "argon2 unavailable, falling back to pbkdf2");
                show_warning("Argon2 is unavailable on this host, using the PBKDF2 format instead");
                processor.encrypt_message_pbkdf2(&message).await?
            }
            other => other?,
        };

        println!("{envelope}");
        Ok(())
    }

    async fn decrypt_text(input: Option<String>, password: Option<String>, prompt: &Prompt) -> Result<()> {
        let input = match input {
            Some(input) => input,
            None => read_stdin().await?,
        };
        let processor = processor(password, ProcessorMode::Decrypt, prompt)?;

        let decrypted = processor.decrypt_text(&input).await.map_err(user_error)?;
        let text = decrypted.as_text().ok_or_else(|| anyhow!("decrypted payload is not text; use decrypt on a file instead"))?;
        println!("{text}");
        Ok(())
    }

    async fn encrypt_file(processor: &Processor, input: &File, output: &File, mime: Option<&str>, params: Argon2Params, force: bool) -> Result<()> {
        input.validate(true, false)?;
        output.validate(false, force)?;

        let bytes = input.read().await?;
        let mime = mime.unwrap_or_else(|| input.mime_type());

        let spinner = Bar::spinner("Encrypting...");
        let envelope = match processor.encrypt_file(&bytes, mime, params).await {
            Err(err) if err.is_key_derivation() => {
                warn!(error = %err, "argon2 unavailable, falling back to pbkdf2");
                show_warning("Argon2 is unavailable on this host, using the PBKDF2 format instead");
                processor.encrypt_file_native(&bytes, mime).await?
            }
            other => other?,
        };
        spinner.finish();

        output.write(&envelope).await?;
        show_success(ProcessorMode::Encrypt, output.path());
        Ok(())
    }

    async fn decrypt_file(processor: &Processor, input: &File, output: Option<File>, force: bool) -> Result<()> {
        input.validate(true, false)?;
        let envelope = input.read().await?;

        let spinner = Bar::spinner("Decrypting...");
        let opened = open_any(processor, &envelope).await;
        spinner.finish();

        match opened? {
            Opened::Item(decrypted) => Self::write_decrypted(input, decrypted, output, force).await,
            Opened::Archive(_) => bail!("{} is a bulk archive; use bulk-extract", input.path().display()),
        }
    }

    async fn write_decrypted(input: &File, decrypted: Decrypted, output: Option<File>, force: bool) -> Result<()> {
        let output = match (output, &decrypted.metadata) {
            (Some(output), _) => output,
            (None, Some(_)) => File::new(input.output_path(ProcessorMode::Decrypt)),
            (None, None) => {
                let text = decrypted.as_text().ok_or_else(|| anyhow!("decrypted payload is not text; pass --output"))?;
                println!("{text}");
                return Ok(());
            }
        };

        output.validate(false, force)?;
        output.write(&decrypted.payload).await?;

        if let Some(metadata) = &decrypted.metadata {
            debug!(mime = metadata.mime_type(), "payload metadata");
        }
        show_success(ProcessorMode::Decrypt, output.path());
        Ok(())
    }

    async fn bulk_encrypt(input: &Path, output: Option<PathBuf>, password: Option<String>, force: bool, cost: &CostArgs, prompt: &Prompt) -> Result<()> {
        // Rebuilding from components drops a trailing separator.
        let folder = File::new(input.components().collect::<PathBuf>());
        let output = File::new(output.unwrap_or_else(|| folder.output_path(ProcessorMode::Encrypt)));
        output.validate(false, force)?;

        let files = collect_folder(input).await?;
        let processor = processor(password, ProcessorMode::Encrypt, prompt)?;

        let mut bar = Bar::new("Encrypting folder");
        let archive = processor.encrypt_bulk(&files, cost.params()?, &mut bar, &NeverPaused).await?;
        bar.finish();

        output.write(&archive).await?;
        show_success(ProcessorMode::Encrypt, output.path());
        Ok(())
    }

    async fn bulk_extract(processor: &Processor, archive: &[u8], opened: &OpenedArchive, root: &Path, only: &[String], force: bool) -> Result<()> {
        let extracted = if only.is_empty() {
            let mut bar = Bar::new("Decrypting folder");
            let files = processor.decrypt_all_files(archive, opened, &mut bar).await.map_err(user_error)?;
            bar.finish();
            files.into_iter().map(|f| (f.path, f.bytes)).collect::<Vec<_>>()
        } else {
            let mut files = Vec::with_capacity(only.len());
            for key in only {
                let entry = opened.manifest.find(key).with_context(|| format!("no entry {key:?} in the archive"))?;
                let bytes = processor.decrypt_one_file(archive, entry, opened.params, opened.data_offset).await.map_err(user_error)?;
                files.push((entry.path.clone(), bytes));
            }
            files
        };

        for (path, bytes) in &extracted {
            let target = File::new(safe_join(root, path)?);
            target.validate(false, force)?;
            target.write(bytes).await?;
        }

        show_extracted(extracted.len(), root);
        Ok(())
    }

    async fn run_interactive(prompt: &Prompt) -> Result<()> {
        print_banner();

        let mode = prompt.select_processing_mode()?;
        let files = File::discover(mode);
        if files.is_empty() {
            bail!("no eligible files found");
        }

        let input = prompt.select_file(&files)?;
        let output = File::new(input.output_path(mode));
        let force = output.path().exists() && prompt.confirm_overwrite(&output)?;
        if output.path().exists() && !force {
            bail!("operation canceled");
        }

        let password = match mode {
            ProcessorMode::Encrypt => prompt.encryption_password()?,
            ProcessorMode::Decrypt => prompt.decryption_password()?,
        };
        let processor = Processor::new(password)?;

        if mode == ProcessorMode::Encrypt {
            return Self::encrypt_file(&processor, &input, &output, None, select_params(DeviceClass::Desktop), force).await;
        }

        let envelope = input.read().await?;
        match open_any(&processor, &envelope).await? {
            Opened::Item(decrypted) => Self::write_decrypted(&input, decrypted, Some(output), force).await,
            Opened::Archive(opened) => Self::bulk_extract(&processor, &envelope, &opened, &default_extract_root(input.path()), &[], force).await,
        }
    }
}

fn processor(password: Option<String>, mode: ProcessorMode, prompt: &Prompt) -> Result<Processor> {
    let password = match (password, mode) {
        (Some(password), _) => Secret::from_string(password),
        (None, ProcessorMode::Encrypt) => prompt.encryption_password()?,
        (None, ProcessorMode::Decrypt) => prompt.decryption_password()?,
    };

    Ok(Processor::new(password)?)
}

/// Binary envelopes and archives first; text files holding an inline envelope second.
async fn open_any(processor: &Processor, envelope: &[u8]) -> Result<Opened> {
    match processor.open_envelope(envelope).await {
        Err(vlock::Error::UnrecognizedFormat) => match std::str::from_utf8(envelope) {
            Ok(text) => processor.decrypt_text(text).await.map(Opened::Item).map_err(user_error),
            Err(_) => Err(user_error(vlock::Error::UnrecognizedFormat)),
        },
        other => other.map_err(user_error),
    }
}

fn default_extract_root(archive: &Path) -> PathBuf {
    archive.to_string_lossy().strip_suffix(FILE_EXTENSION).map_or_else(|| archive.with_extension("extracted"), PathBuf::from)
}

/// Collapses an engine error into its user-facing message. Details go to the log only.
fn user_error(err: vlock::Error) -> anyhow::Error {
    debug!(error = %err, "operation failed");
    anyhow!(err.user_message())
}

async fn read_stdin() -> Result<String> {
    let mut input = String::new();
    stdin().read_to_string(&mut input).await.context("failed to read stdin")?;
    Ok(input.trim_end_matches(['\r', '\n']).to_owned())
}
