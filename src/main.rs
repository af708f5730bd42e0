use anyhow::{Context, Result, anyhow, bail};
use autumnus::{FormatterOption, Options, highlight, themes};
use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use iocraft::prelude::*;
use nhost_storage::envelope::EnvelopePayload;
use nhost_storage::{
    DeleteParams, Envelope, GetUrlParams, PresignedUrlParams, StorageClient, StorageError,
    StringFormat, UploadFile, UploadParams, UploadString,
};
use serde::Serialize;
use serde_json::Value;
use std::{
    future::Future,
    io::{self, Write},
    path::PathBuf,
};
use tracing_subscriber::EnvFilter;
use url::Url;
use uuid::Uuid;

use crate::ui::{
    ConfigHeader, ErrorMessage, InputPrompt, MetadataTable, SuccessMessage, Working,
};

mod config;
mod ui;

const DEFAULT_STORAGE_URL: &str = "https://local.storage.local.nhost.run/v1";

#[derive(Parser)]
#[command(name = "nhost-storage")]
#[command(version)]
#[command(about = "A tool for managing files in Nhost storage")]
struct Cli {
    /// Print results as `{payload, error}` JSON objects
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload a file
    Upload {
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,
        /// File ID to assign, generated by the server when omitted
        #[arg(long)]
        id: Option<Uuid>,
        /// Stored file name, defaults to the local file name
        #[arg(short, long)]
        name: Option<String>,
        /// Target bucket, defaults to the configured bucket
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Upload a string as a file
    UploadString {
        /// Stored file name
        name: String,
        data: String,
        /// Treat DATA as a `data:` URL
        #[arg(long)]
        data_url: bool,
        #[arg(long)]
        content_type: Option<String>,
        #[arg(long)]
        id: Option<Uuid>,
        #[arg(short, long)]
        bucket: Option<String>,
    },
    /// Print the public URL of a file
    Url { file_id: Uuid },
    /// Get a presigned URL for a file
    Presign { file_id: Uuid },
    /// Delete a file
    Delete { file_id: Uuid },
    /// Show every object header of a file
    Head { file_id: Uuid },
    /// Show the metadata of a file
    Metadata { file_id: Uuid },
    /// Configure nhost-storage interactively
    Config,
    /// Store your admin secret in the OS keyring
    SetAdminSecret { admin_secret: String },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let _rt_guard = rt.enter();
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();
    let cli = Cli::parse();
    let json = cli.json;

    rt.block_on(async {
        match cli.command {
            Commands::Config => interactive_config(),
            Commands::SetAdminSecret { admin_secret } => {
                config::set_admin_secret_keyring(admin_secret)
            }
            requires_client => {
                let config = config::read_config()?;
                let client = StorageClient::new(config.storage_url, config.auth);
                let default_bucket_id = config.default_bucket_id;

                match requires_client {
                    Commands::Upload {
                        file,
                        id,
                        name,
                        bucket,
                    } => {
                        upload_file(&client, file, id, name, bucket.or(default_bucket_id), json)
                            .await
                    }
                    Commands::UploadString {
                        name,
                        data,
                        data_url,
                        content_type,
                        id,
                        bucket,
                    } => {
                        let format = if data_url {
                            StringFormat::DataUrl
                        } else {
                            StringFormat::Raw
                        };
                        let upload = UploadString {
                            path: name,
                            data,
                            format,
                            content_type,
                        };
                        upload_string(&client, upload, id, bucket.or(default_bucket_id), json)
                            .await
                    }
                    Commands::Url { file_id } => print_public_url(&client, file_id, json),
                    Commands::Presign { file_id } => presign(&client, file_id, json).await,
                    Commands::Delete { file_id } => delete_file(&client, file_id, json).await,
                    Commands::Head { file_id } => print_head(&client, file_id, json).await,
                    Commands::Metadata { file_id } => print_metadata(&client, file_id, json).await,
                    Commands::Config | Commands::SetAdminSecret { .. } => {
                        unreachable!("handled before the client is built")
                    }
                }
            }
        }
    })
}

/// Prints the result as an envelope in JSON mode, otherwise hands the
/// payload to `render`.
fn report<T, F>(result: Result<T, StorageError>, json: bool, render: F) -> Result<()>
where
    T: EnvelopePayload + Serialize,
    F: FnOnce(T) -> Result<()>,
{
    if json {
        let envelope = Envelope::from(result);
        println!("{}", serde_json::to_string_pretty(&envelope)?);
        return envelope
            .into_result()
            .map(|_| ())
            .map_err(|error| anyhow!(error.message));
    }

    render(result?)
}

async fn with_spinner<F: Future>(label: &str, json: bool, fut: F) -> F::Output {
    if json {
        return fut.await;
    }

    let mut spinner = element!(Working(label: label.to_string()));
    tokio::pin!(fut);

    tokio::select! {
        output = &mut fut => output,
        _ = spinner.render_loop() => fut.await,
    }
}

/// Flattens a serialized payload into display rows, one per present field.
fn rows<T: Serialize>(payload: &T) -> Result<Vec<(String, String)>> {
    let value = serde_json::to_value(payload)?;
    let Value::Object(fields) = value else {
        bail!("Expected an object payload");
    };

    Ok(fields
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(text) => text,
                other => other.to_string(),
            };
            (key, value)
        })
        .collect())
}

async fn upload_file(
    client: &StorageClient,
    file: PathBuf,
    id: Option<Uuid>,
    name: Option<String>,
    bucket_id: Option<String>,
    json: bool,
) -> Result<()> {
    let upload = UploadFile::from_path(&file)
        .await
        .with_context(|| format!("Unable to read {}", file.display()))?;

    let name = name.unwrap_or_else(|| upload.file_name.clone());
    let params = UploadParams {
        file: upload,
        id: id.map(|id| id.to_string()),
        name: Some(name.clone()),
        bucket_id,
    };

    let result = with_spinner("Uploading", json, client.upload(params)).await;
    report(result, json, |head| {
        element!(SuccessMessage(message: format!("Uploaded {}", name))).print();
        element!(MetadataTable(title: name, rows: rows(&head)?)).print();
        Ok(())
    })
}

async fn upload_string(
    client: &StorageClient,
    upload: UploadString,
    id: Option<Uuid>,
    bucket_id: Option<String>,
    json: bool,
) -> Result<()> {
    let name = upload.path.clone();
    let mut params = upload.into_upload_params()?;
    params.id = id.map(|id| id.to_string());
    params.bucket_id = bucket_id;

    let result = with_spinner("Uploading", json, client.upload(params)).await;
    report(result, json, |head| {
        element!(SuccessMessage(message: format!("Uploaded {}", name))).print();
        element!(MetadataTable(title: name, rows: rows(&head)?)).print();
        Ok(())
    })
}

fn print_public_url(client: &StorageClient, file_id: Uuid, json: bool) -> Result<()> {
    let result = client.get_public_url(&GetUrlParams {
        file_id: file_id.to_string(),
    });
    report(result, json, |url| {
        println!("{}", url);
        Ok(())
    })
}

async fn presign(client: &StorageClient, file_id: Uuid, json: bool) -> Result<()> {
    let params = PresignedUrlParams {
        file_id: file_id.to_string(),
    };

    let result = with_spinner("Signing", json, client.get_presigned_url(&params)).await;
    report(result, json, |presigned| {
        println!("{}", presigned.url);
        element!(SuccessMessage(message: format!(
            "Valid for {}",
            humantime::format_duration(presigned.expiration)
        )))
        .print();
        Ok(())
    })
}

async fn delete_file(client: &StorageClient, file_id: Uuid, json: bool) -> Result<()> {
    let params = DeleteParams {
        file_id: file_id.to_string(),
    };

    let result = with_spinner("Deleting", json, client.delete(&params)).await;
    report(result, json, |()| {
        element!(SuccessMessage(message: format!("File {} deleted", file_id))).print();
        Ok(())
    })
}

async fn print_head(client: &StorageClient, file_id: Uuid, json: bool) -> Result<()> {
    let file_id = file_id.to_string();
    let result = with_spinner("Fetching headers", json, client.head(&file_id)).await;
    report(result, json, |head| {
        let output = highlight(
            &serde_json::to_string_pretty(&head)?,
            Options {
                formatter: FormatterOption::Terminal {
                    theme: Some(
                        themes::get("ayu_light").expect("Syntax highlighting theme not found"),
                    ),
                },
                lang_or_file: Some("json"),
            },
        );
        println!("{}", output);
        Ok(())
    })
}

async fn print_metadata(client: &StorageClient, file_id: Uuid, json: bool) -> Result<()> {
    let file_id = file_id.to_string();
    let result = with_spinner("Fetching metadata", json, client.get_metadata(&file_id)).await;
    report(result, json, |metadata| {
        let title = metadata.key.clone();
        element!(MetadataTable(title: title, rows: rows(&metadata)?)).print();
        Ok(())
    })
}

fn read_input(prompt: &str, default: Option<&str>, description: Option<&str>) -> Result<String> {
    println!();
    element! {
        InputPrompt(
            prompt: prompt.to_string(),
            default: default.map(|s| s.to_string()),
            description: description.map(|s| s.to_string())
        )
    }
    .print();

    print!("> ");
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_string();

    if input.is_empty() {
        if let Some(def) = default {
            Ok(def.to_string())
        } else {
            Ok(input)
        }
    } else {
        Ok(input)
    }
}

fn interactive_config() -> Result<()> {
    element!(ConfigHeader()).print();

    let storage_url = loop {
        let storage_url_str = read_input(
            "Storage URL",
            Some(DEFAULT_STORAGE_URL),
            Some("The storage endpoint of your Nhost project"),
        )?;

        match Url::parse(&storage_url_str) {
            Ok(url) => break url,
            Err(e) => {
                element!(ErrorMessage(message: format!("Invalid URL: {}", e))).print();
            }
        }
    };

    let admin_secret = read_input(
        "Admin Secret",
        None,
        Some("Optional: stored securely in the OS keyring, leave empty for anonymous access"),
    )?;

    let default_bucket_str = read_input(
        "Default Bucket",
        None,
        Some("Optional: bucket used when --bucket is not given"),
    )?;
    let default_bucket_id = if default_bucket_str.is_empty() {
        None
    } else {
        Some(default_bucket_str)
    };

    if !admin_secret.is_empty() {
        config::set_admin_secret_keyring(admin_secret)?;
    }

    let config_file = config::ConfigFile {
        storage_url: Some(storage_url),
        default_bucket_id,
    };

    config::write_config(config_file)?;

    element!(SuccessMessage(message: "Configuration complete!".to_string())).print();

    Ok(())
}
