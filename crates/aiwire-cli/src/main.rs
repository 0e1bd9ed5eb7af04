mod display;

use std::path::PathBuf;

use aiwire_ai::ClipModel;
use aiwire_connectors::{
    CompletionsClient, CompletionsConfig, GrokClient, GrokConfig, SpeechClient, SpeechConfig,
    TextGenerator, VisionClient, VisionConfig,
};
use aiwire_store::DuckStore;
use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::info;

use crate::display::ColumnKind;

#[derive(Parser)]
#[command(name = "aiwire", version, about = "Small clients for cloud AI APIs and local inference")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Normalize logits into probabilities.
    Softmax {
        #[arg(required = true, allow_negative_numbers = true)]
        logits: Vec<f32>,
        /// Comma-separated labels, one per logit (defaults to indices).
        #[arg(long, value_delimiter = ',')]
        labels: Vec<String>,
    },
    /// Zero-shot image classification with an ONNX CLIP model.
    Classify {
        #[arg(long, env = "AIWIRE_CLIP_MODEL", default_value = "models/clip-vit-base-patch32")]
        model_dir: PathBuf,
        #[arg(long)]
        image: PathBuf,
        #[arg(long, value_delimiter = ',', required = true)]
        labels: Vec<String>,
    },
    /// Generate text from a prompt.
    Generate {
        #[arg(long, value_enum, default_value_t = Provider::Openai)]
        provider: Provider,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Override the provider's default model.
        #[arg(long)]
        model: Option<String>,
        #[command(flatten)]
        keys: GenerateKeys,
    },
    /// Text-to-speech with Azure Speech.
    Speak {
        #[arg(long)]
        text: String,
        #[arg(long)]
        voice: Option<String>,
        #[arg(long, default_value = "speech.wav")]
        out: PathBuf,
        #[command(flatten)]
        azure: SpeechArgs,
    },
    /// Speech-to-text with Azure Speech (16 kHz mono WAV).
    Transcribe {
        #[arg(long)]
        audio: PathBuf,
        #[arg(long, default_value = "en-US")]
        language: String,
        #[command(flatten)]
        azure: SpeechArgs,
    },
    /// Detect faces with Azure Vision.
    Faces {
        #[arg(long, conflicts_with = "image", required_unless_present = "image")]
        url: Option<String>,
        #[arg(long)]
        image: Option<PathBuf>,
        #[arg(long, env = "AZURE_VISION_KEY", hide_env_values = true)]
        key: String,
        #[arg(long, env = "AZURE_VISION_ENDPOINT")]
        endpoint: String,
    },
    /// Run SQL against DuckDB and print the result.
    Query {
        /// Database file (in-memory when omitted).
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        sql: String,
        /// Print only this column, one value per line.
        #[arg(long)]
        column: Option<String>,
        #[arg(long = "as", value_enum, default_value_t = ColumnKind::String)]
        kind: ColumnKind,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Provider {
    Openai,
    Grok,
}

#[derive(Args)]
struct GenerateKeys {
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_key: Option<String>,
    #[arg(long, env = "OPENAI_BASE_URL")]
    openai_base_url: Option<String>,
    #[arg(long, env = "XAI_API_KEY", hide_env_values = true)]
    xai_key: Option<String>,
    #[arg(long, env = "XAI_BASE_URL")]
    xai_base_url: Option<String>,
}

#[derive(Args)]
struct SpeechArgs {
    #[arg(long, env = "AZURE_SPEECH_KEY", hide_env_values = true)]
    key: String,
    #[arg(long, env = "AZURE_SPEECH_REGION", default_value = "")]
    region: String,
    #[arg(long, env = "AZURE_SPEECH_ENDPOINT")]
    endpoint: Option<String>,
}

impl SpeechArgs {
    fn client(self) -> anyhow::Result<SpeechClient> {
        let mut config = SpeechConfig::new(self.key, self.region);
        config.endpoint = self.endpoint;
        Ok(SpeechClient::new(config)?)
    }
}

fn text_generator(
    provider: Provider,
    model: Option<String>,
    keys: GenerateKeys,
) -> anyhow::Result<Box<dyn TextGenerator>> {
    Ok(match provider {
        Provider::Openai => {
            let key = keys.openai_key.context("OPENAI_API_KEY is not set")?;
            let mut config = CompletionsConfig::new(key);
            if let Some(url) = keys.openai_base_url {
                config = config.with_base_url(url);
            }
            if let Some(model) = model {
                config = config.with_model(model);
            }
            Box::new(CompletionsClient::new(config)?)
        }
        Provider::Grok => {
            let key = keys.xai_key.context("XAI_API_KEY is not set")?;
            let mut config = GrokConfig::new(key);
            if let Some(url) = keys.xai_base_url {
                config = config.with_base_url(url);
            }
            if let Some(model) = model {
                config = config.with_model(model);
            }
            Box::new(GrokClient::new(config)?)
        }
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();
    info!("aiwire v{}", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    match cli.command {
        Command::Softmax { logits, labels } => {
            let labels = if labels.is_empty() {
                (0..logits.len()).map(|i| i.to_string()).collect()
            } else {
                labels
            };
            let probs = aiwire_ai::softmax_labeled(labels, &logits)?;
            display::print_probabilities(&probs)?;
        }
        Command::Classify {
            model_dir,
            image,
            labels,
        } => {
            let mut model = ClipModel::load(&model_dir)
                .with_context(|| format!("loading CLIP model from {}", model_dir.display()))?;
            let labels: Vec<&str> = labels.iter().map(String::as_str).collect();
            let probs = model.classify(&image, &labels)?;
            display::print_probabilities(&probs)?;
        }
        Command::Generate {
            provider,
            prompt,
            max_tokens,
            model,
            keys,
        } => {
            let generator = text_generator(provider, model, keys)?;
            let generation = generator
                .generate(&prompt, max_tokens)
                .await
                .with_context(|| format!("{} request failed", generator.name()))?;
            println!("{}", generation.text.trim());
            if let Some(usage) = generation.usage {
                info!(
                    model = %generation.model,
                    prompt_tokens = usage.prompt_tokens,
                    completion_tokens = usage.completion_tokens,
                    "token usage"
                );
            }
        }
        Command::Speak {
            text,
            voice,
            out,
            azure,
        } => {
            let client = azure.client()?;
            let audio = client.synthesize(&text, voice.as_deref()).await?;
            tokio::fs::write(&out, &audio)
                .await
                .with_context(|| format!("writing {}", out.display()))?;
            println!("Wrote {} bytes to {}", audio.len(), out.display());
        }
        Command::Transcribe {
            audio,
            language,
            azure,
        } => {
            let wav = tokio::fs::read(&audio)
                .await
                .with_context(|| format!("reading {}", audio.display()))?;
            let recognition = azure.client()?.recognize(wav, &language).await?;
            println!("{}", recognition.text);
        }
        Command::Faces {
            url,
            image,
            key,
            endpoint,
        } => {
            let client = VisionClient::new(VisionConfig::new(key, endpoint))?;
            let faces = match (url, image) {
                (Some(url), _) => client.analyze_faces_url(&url).await?,
                (None, Some(path)) => {
                    let bytes = tokio::fs::read(&path)
                        .await
                        .with_context(|| format!("reading {}", path.display()))?;
                    client.analyze_faces_bytes(bytes).await?
                }
                (None, None) => anyhow::bail!("either --url or --image is required"),
            };
            display::print_faces(&faces);
        }
        Command::Query {
            db,
            sql,
            column,
            kind,
        } => {
            let store = match &db {
                Some(path) => DuckStore::open_persistent(path)?,
                None => DuckStore::open()?,
            };
            let batches = store.query_arrow(&sql)?;
            match column {
                Some(column) => display::print_column(&batches, &column, kind)?,
                None => display::print_batches(&batches)?,
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn softmax_accepts_negative_logits() {
        let cli = Cli::try_parse_from(["aiwire", "softmax", "-1.5", "2", "--labels", "a,b"]).unwrap();
        match cli.command {
            Command::Softmax { logits, labels } => {
                assert_eq!(logits, vec![-1.5, 2.0]);
                assert_eq!(labels, vec!["a", "b"]);
            }
            _ => panic!("expected softmax"),
        }
    }

    #[test]
    fn faces_requires_a_source() {
        assert!(
            Cli::try_parse_from(["aiwire", "faces", "--key", "k", "--endpoint", "https://x"])
                .is_err()
        );
    }

    #[test]
    fn grok_without_key_is_error() {
        let keys = GenerateKeys {
            openai_key: None,
            openai_base_url: None,
            xai_key: None,
            xai_base_url: None,
        };
        let err = text_generator(Provider::Grok, None, keys).err().unwrap();
        assert!(err.to_string().contains("XAI_API_KEY"));
    }

    #[test]
    fn provider_selects_generator() {
        let keys = GenerateKeys {
            openai_key: Some("sk-test".into()),
            openai_base_url: None,
            xai_key: None,
            xai_base_url: None,
        };
        let generator = text_generator(Provider::Openai, Some("davinci-002".into()), keys).unwrap();
        assert_eq!(generator.name(), "openai");
    }
}
