//! Upload a file into an organization, or list an organization's files.
//!
//! ```bash
//! filehub-upload --server http://localhost:3001 --identity user_42 upload --title "Q3 report" --file report.pdf
//! filehub-upload --server http://localhost:3001 --identity user_42 list --org user_42
//! ```

use anyhow::{Context, bail};
use bytes::Bytes;
use clap::{Args, Parser, Subcommand};
use filehub::client::{
    Credentials, FilesClient,
    form::{ActiveOrganization, SelectedFile, SubmitOutcome, UploadForm},
};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use url::Url;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Base URL of the filehub server
    #[arg(long, env = "FILEHUB_SERVER", default_value = "http://localhost:3001")]
    server: Url,

    /// Session token sent as a bearer token
    #[arg(long, env = "FILEHUB_TOKEN", conflicts_with = "identity")]
    token: Option<String>,

    /// Token identifier asserted through the proxy identity header
    #[arg(long, env = "FILEHUB_IDENTITY")]
    identity: Option<String>,

    /// Organizations asserted along with --identity, comma separated
    #[arg(long, requires = "identity", value_delimiter = ',')]
    orgs: Option<Vec<String>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Upload a file and share it with an organization
    Upload(UploadArgs),
    /// List the files of an organization
    List {
        #[arg(long)]
        org: String,
    },
}

#[derive(Args, Debug)]
struct UploadArgs {
    /// Display name of the file
    #[arg(long)]
    title: String,

    #[arg(long)]
    file: PathBuf,

    /// Organization to share with. Defaults to the personal organization of --user-id.
    #[arg(long)]
    org: Option<String>,

    /// Your user id, used as the organization when --org is absent. Defaults to --identity.
    #[arg(long)]
    user_id: Option<String>,

    /// Content type of the file. Guessed from the file name when absent.
    #[arg(long)]
    content_type: Option<String>,
}

fn credentials(cli: &Cli) -> Credentials {
    match (&cli.token, &cli.identity) {
        (Some(token), _) => Credentials::Session(token.clone()),
        (None, Some(identity)) => Credentials::ProxyIdentity {
            token_identifier: identity.clone(),
            org_ids: cli.orgs.clone(),
        },
        (None, None) => Credentials::Anonymous,
    }
}

async fn upload(client: &FilesClient, args: UploadArgs, identity: Option<&str>) -> anyhow::Result<()> {
    let content = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;
    let name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| args.title.clone());
    let content_type = args
        .content_type
        .unwrap_or_else(|| mime_guess::from_path(&args.file).first_or_octet_stream().essence_str().to_string());

    let Some(org) = ActiveOrganization::resolve(args.org.as_deref(), args.user_id.as_deref().or(identity)) else {
        bail!("no organization: pass --org or --user-id");
    };

    let mut form = UploadForm::new();
    form.open();
    form.set_title(args.title);
    form.attach_file(SelectedFile {
        name,
        content_type,
        content: Bytes::from(content),
    });

    match form.submit(client, Some(&org)).await {
        SubmitOutcome::Uploaded { file_id, notification } => {
            println!("{}: {}", notification.title, notification.description);
            println!("{file_id} shared with {}", org.org_id());
            Ok(())
        }
        SubmitOutcome::Failed { error, notification } => {
            eprintln!("{}: {}", notification.title, notification.description);
            Err(error.into())
        }
        SubmitOutcome::Invalid(errors) => {
            let messages: Vec<&str> = [errors.title, errors.file].into_iter().flatten().collect();
            bail!("{}", messages.join("; "))
        }
        SubmitOutcome::NotReady | SubmitOutcome::Ignored => bail!("the upload form was not ready"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let client = FilesClient::new(cli.server.clone(), credentials(&cli))?;

    match cli.command {
        Command::Upload(args) => upload(&client, args, cli.identity.as_deref()).await,
        Command::List { org } => {
            for file in client.get_files(&org).await? {
                println!("{}\t{}\t{}\t{}", file.created_at.to_rfc3339(), file.id, file.file_id, file.name);
            }
            Ok(())
        }
    }
}
