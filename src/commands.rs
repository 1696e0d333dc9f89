//! Subcommand implementations

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use anyhow::{bail, Context, Result};
use dialoguer::{Confirm, Input};
use forge_client::{
    analytics, categories, find_template, templates_in, visible_apps, AppState, ModelCatalog,
    Provider, SortBy,
};
use forge_server::integrations::{ChatConfig, HttpChat, LocalPlatform};
use forge_server::persistence::RecordStore;
use forge_server::pipeline::{
    bulk_export_file_name, export_file_name, share_link, DeployRequest, DeploymentPipeline, Launch,
    PipelineConfig,
};
use forge_utils::{time::now_millis, ApplicationRecord};
use log::info;
use uuid::Uuid;

use crate::{Cli, Commands};

pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Commands::Templates { category } => return print_templates(category),
        Commands::Models { provider } => return list_models(&cli, provider.as_deref()).await,
        _ => {}
    }

    let mut forge = Forge::open(&cli).await?;
    forge.dispatch(cli.command).await
}

fn chat_config(cli: &Cli) -> ChatConfig {
    let mut config = ChatConfig::default();
    if let Some(url) = &cli.chat_url {
        config.endpoint = url.clone();
    }
    config.api_key = cli.api_key.clone();
    config
}

fn format_millis(ms: i64) -> String {
    let time = UNIX_EPOCH + Duration::from_millis(ms.max(0) as u64);
    humantime::format_rfc3339_seconds(time).to_string()
}

fn summary_line(app: &ApplicationRecord) -> String {
    format!(
        "{}  {}{}  v{}  {} views  {}  {}",
        app.id.map(|id| id.to_string()).unwrap_or_default(),
        if app.favorite { "★ " } else { "" },
        app.display_name(),
        app.version,
        app.views,
        app.hosted_url,
        format_millis(app.created_at),
    )
}

fn print_templates(category: &str) -> Result<()> {
    let templates = templates_in(category);
    if templates.is_empty() {
        bail!(
            "unknown category {}; choose one of: {}",
            category,
            categories().join(", ")
        );
    }
    for template in templates {
        println!(
            "{} {:<10} {:<20} [{}]",
            template.icon, template.id, template.name, template.category
        );
    }
    Ok(())
}

async fn list_models(cli: &Cli, provider: Option<&str>) -> Result<()> {
    let provider = match provider {
        Some(name) => Some(
            Provider::parse(name).with_context(|| format!("unknown provider {}", name))?,
        ),
        None => None,
    };
    let chat = HttpChat::new(chat_config(cli))?;
    let catalog = ModelCatalog::from_ids(
        chat.list_models()
            .await
            .context("could not fetch the model catalog")?,
    );
    let default_model = cli
        .model
        .clone()
        .unwrap_or_else(|| PipelineConfig::default().default_model);

    for model in catalog.filter(provider) {
        let marker = if model.id == default_model { "*" } else { " " };
        println!("{} {:<10} {}", marker, model.provider, model.id);
    }
    Ok(())
}

/// Pipeline plus presentation state for one invocation
struct Forge {
    pipeline: DeploymentPipeline,
    state: AppState,
}

impl Forge {
    async fn open(cli: &Cli) -> Result<Self> {
        tokio::fs::create_dir_all(&cli.data_dir)
            .await
            .with_context(|| format!("cannot create {}", cli.data_dir.display()))?;

        let records = RecordStore::connect(
            cli.database_url.clone(),
            Some(cli.data_dir.join("records.json")),
        )
        .await;
        info!("Vibeforge: record store backend {}", records.backend());

        let chat = Arc::new(HttpChat::new(chat_config(cli))?);
        let local = Arc::new(LocalPlatform::open(cli.data_dir.join("platform")).await?);
        let platform = local.into_platform(chat);

        let mut config = PipelineConfig::default();
        if let Some(model) = &cli.model {
            config.default_model = model.clone();
        }
        if let Some(domain) = &cli.hosting_domain {
            config.hosting_domain = domain.clone();
        }

        let pipeline = DeploymentPipeline::new(platform, records, config);
        let state = AppState::new(pipeline.activity());
        Ok(Self { pipeline, state })
    }

    async fn dispatch(&mut self, command: Commands) -> Result<()> {
        match command {
            Commands::Login => self.login().await,
            Commands::Deploy {
                prompt,
                template,
                name,
                title,
                tags,
            } => self.deploy(prompt, template, name, title, tags).await,
            Commands::Redeploy { id, file, tags } => self.redeploy(id, &file, tags).await,
            Commands::List {
                search,
                sort,
                favorites,
                tags,
                stats,
            } => self.list(search, sort, favorites, tags, stats).await,
            Commands::Versions { id } => self.versions(id).await,
            Commands::Restore { id, version, out } => self.restore(id, version, out).await,
            Commands::Delete { ids, yes } => self.delete(ids, yes).await,
            Commands::Favorite { id } => self.favorite(id).await,
            Commands::Launch { id } => self.launch(id).await,
            Commands::Export { id, out } => self.export(id, out).await,
            Commands::Import { file } => self.import(&file).await,
            Commands::Share { id, origin } => self.share(id, &origin).await,
            Commands::Templates { .. } | Commands::Models { .. } => Ok(()),
        }
    }

    /// Activity goes to stderr so stdout stays pipeable
    fn print_activity(&self) {
        for entry in self.state.activity().entries() {
            eprintln!("{}", entry);
        }
    }

    async fn find_app(&self, id: Uuid) -> Result<ApplicationRecord> {
        self.pipeline
            .records()
            .get_app(id)
            .await
            .with_context(|| format!("no app with id {}", id))
    }

    async fn ensure_signed_in(&self) -> Result<()> {
        if self.pipeline.current_user().await.is_none() {
            self.pipeline.sign_in().await?;
        }
        Ok(())
    }

    async fn login(&self) -> Result<()> {
        let user = self.pipeline.sign_in().await?;
        println!("Signed in as {}", user.username);
        Ok(())
    }

    async fn deploy(
        &mut self,
        prompt: Option<String>,
        template: Option<String>,
        name: String,
        title: String,
        tags: Vec<String>,
    ) -> Result<()> {
        if let Some(id) = template {
            let template = find_template(&id).with_context(|| format!("unknown template {}", id))?;
            self.state.select_template(template);
        }
        if let Some(prompt) = prompt {
            self.state.prompt = prompt;
        }
        if self.state.prompt.trim().is_empty() {
            self.state.prompt = Input::<String>::new()
                .with_prompt("What should I build?")
                .interact_text()?;
        }
        if !name.is_empty() {
            self.state.app_name = name;
        }
        if !title.is_empty() {
            self.state.app_title = title;
        }
        for tag in &tags {
            self.state.add_tag(tag);
        }
        self.ensure_signed_in().await?;

        let request = DeployRequest {
            prompt: self.state.prompt.clone(),
            name: self.state.app_name.clone(),
            title: self.state.app_title.clone(),
            model: None,
            tags: self.state.tag_set(),
        };
        self.state.begin_build();
        let result = self.pipeline.initial_deploy(&request).await;
        let deployed = match &result {
            Ok(Some(deployment)) => Some(deployment.record.clone()),
            _ => None,
        };
        self.state.finish_build(deployed);
        self.print_activity();

        match result? {
            Some(deployment) => {
                println!(
                    "{}  {}",
                    deployment.record.id.map(|id| id.to_string()).unwrap_or_default(),
                    deployment.hosted_url
                );
                Ok(())
            }
            None => bail!("nothing was deployed; a prompt and a signed-in session are required"),
        }
    }

    async fn redeploy(&mut self, id: Uuid, file: &Path, tags: Vec<String>) -> Result<()> {
        let code = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("cannot read {}", file.display()))?;
        let record = self.find_app(id).await?;
        self.state.select_app(record.clone());
        self.state.edit_code = code;
        if !tags.is_empty() {
            self.state.tags.clear();
            for tag in &tags {
                self.state.add_tag(tag);
            }
        }
        let code = match self.state.pending_edit() {
            Some(code) => code.to_string(),
            None => bail!("{} is empty", file.display()),
        };
        self.ensure_signed_in().await?;

        self.state.begin_redeploy();
        let result = self
            .pipeline
            .redeploy(&record, &code, &self.state.tag_set())
            .await;
        let updated = match &result {
            Ok(Some(deployment)) => Some(deployment.record.clone()),
            _ => None,
        };
        self.state.finish_redeploy(updated);
        self.print_activity();

        match result? {
            Some(deployment) => {
                println!("v{}  {}", deployment.record.version, deployment.hosted_url);
                Ok(())
            }
            None => bail!("nothing was redeployed"),
        }
    }

    async fn list(
        &mut self,
        search: String,
        sort: SortBy,
        favorites: bool,
        tags: Vec<String>,
        stats: bool,
    ) -> Result<()> {
        self.state.search_query = search;
        self.state.sort_by = sort;
        self.state.favorites_only = favorites;
        for tag in &tags {
            self.state.toggle_tag_filter(tag);
        }

        let apps = self.pipeline.records().list_apps().await?;
        for app in visible_apps(&apps, &self.state) {
            println!("{}", summary_line(app));
        }

        if stats {
            let versions = self.pipeline.records().list_versions().await?;
            let stats = analytics(&apps, &versions, None);
            println!();
            println!("apps:          {}", stats.total_apps);
            println!("favorites:     {}", stats.favorites);
            println!("total views:   {}", stats.total_views);
            println!("models used:   {}", stats.models_used);
            println!("avg code size: {} chars", stats.avg_code_size);
            println!("versions:      {}", versions.len());
        }
        Ok(())
    }

    async fn versions(&self, id: Uuid) -> Result<()> {
        let record = self.find_app(id).await?;
        println!("{} (current v{})", record.display_name(), record.version);
        for version in self.pipeline.versions_for(id).await? {
            println!(
                "v{:<4} {}  {:>8} bytes  {}",
                version.version,
                format_millis(version.created_at),
                version.code.len(),
                version.note
            );
        }
        Ok(())
    }

    async fn restore(&mut self, id: Uuid, version: u32, out: Option<PathBuf>) -> Result<()> {
        let record = self.find_app(id).await?;
        self.state.select_app(record);
        let snapshot = self
            .pipeline
            .records()
            .find_version(id, version)
            .await?
            .with_context(|| format!("app {} has no version {}", id, version))?;
        self.state.restore_version(&snapshot);
        self.print_activity();

        match out {
            Some(path) => {
                tokio::fs::write(&path, self.state.display_code())
                    .await
                    .with_context(|| format!("cannot write {}", path.display()))?;
                eprintln!(
                    "Redeploy with: vibeforge redeploy --id {} --file {}",
                    id,
                    path.display()
                );
            }
            None => println!("{}", self.state.display_code()),
        }
        Ok(())
    }

    async fn delete(&mut self, ids: Vec<Uuid>, yes: bool) -> Result<()> {
        if !yes {
            let confirmed = Confirm::new()
                .with_prompt(format!(
                    "Delete {} app(s) with their hosting and version history?",
                    ids.len()
                ))
                .default(false)
                .interact()?;
            if !confirmed {
                return Ok(());
            }
        }

        if let [id] = ids[..] {
            let record = self.find_app(id).await?;
            let result = self.pipeline.delete_app(&record).await;
            self.print_activity();
            result?;
            self.state.record_deleted(id);
            println!("deleted {}", id);
            return Ok(());
        }

        for id in ids {
            self.state.toggle_bulk(id);
        }
        let selection = self.state.take_bulk();
        let report = self.pipeline.bulk_delete(&selection).await;
        self.print_activity();
        for id in &report.deleted {
            self.state.record_deleted(*id);
            println!("deleted {}", id);
        }
        for id in &report.missing {
            println!("skipped {} (not found)", id);
        }
        for (id, reason) in &report.failed {
            println!("failed  {}: {}", id, reason);
        }
        if !report.failed.is_empty() {
            bail!("{} of {} deletions failed", report.failed.len(), selection.len());
        }
        Ok(())
    }

    async fn favorite(&mut self, id: Uuid) -> Result<()> {
        let record = self.find_app(id).await?;
        let updated = self.pipeline.toggle_favorite(&record).await?;
        self.state.record_updated(&updated);
        println!(
            "{} is {}",
            updated.display_name(),
            if updated.favorite { "a favorite" } else { "no longer a favorite" }
        );
        Ok(())
    }

    async fn launch(&self, id: Uuid) -> Result<()> {
        let record = self.find_app(id).await?;
        match self.pipeline.launch(&record).await? {
            Launch::Launched(name) => println!("launched {}", name),
            Launch::OpenUrl(url) => println!("{}", url),
        }
        Ok(())
    }

    async fn export(&self, id: Option<Uuid>, out: Option<PathBuf>) -> Result<()> {
        let (json, default_name) = match id {
            Some(id) => {
                let record = self.find_app(id).await?;
                (self.pipeline.export_one(&record)?, export_file_name(&record))
            }
            None => (
                self.pipeline.export_all().await?,
                bulk_export_file_name(now_millis()),
            ),
        };
        let path = out.unwrap_or_else(|| PathBuf::from(default_name));
        tokio::fs::write(&path, json)
            .await
            .with_context(|| format!("cannot write {}", path.display()))?;
        self.print_activity();
        println!("{}", path.display());
        Ok(())
    }

    async fn import(&self, file: &Path) -> Result<()> {
        let text = tokio::fs::read_to_string(file)
            .await
            .with_context(|| format!("cannot read {}", file.display()))?;
        let result = self.pipeline.import_apps(&text).await;
        self.print_activity();
        for record in result? {
            println!("{}", summary_line(&record));
        }
        Ok(())
    }

    async fn share(&self, id: Uuid, origin: &str) -> Result<()> {
        let record = self.find_app(id).await?;
        println!("{}", share_link(origin, &record)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn cli(data_dir: &Path, args: &[&str]) -> Cli {
        let mut argv = vec![
            "vibeforge".to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
        ];
        argv.extend(args.iter().map(|a| a.to_string()));
        Cli::parse_from(argv)
    }

    #[test]
    fn test_format_millis() {
        assert_eq!(format_millis(0), "1970-01-01T00:00:00Z");
        assert_eq!(format_millis(86_400_000 + 1_500), "1970-01-02T00:00:01Z");
        assert_eq!(format_millis(-5), "1970-01-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_import_then_export_through_the_cli() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let backup = dir.path().join("backup.json");
        let exported = dir.path().join("exported.json");
        tokio::fs::write(
            &backup,
            r#"[{"prompt": "a clock", "code": "<!DOCTYPE html><html><head></head><body></body></html>", "tags": ["time"]}]"#,
        )
        .await
        .unwrap();

        let import = cli(&data_dir, &["import", "--file", backup.to_str().unwrap()]);
        run(import).await.unwrap();

        let export = cli(&data_dir, &["export", "--out", exported.to_str().unwrap()]);
        run(export).await.unwrap();

        let text = tokio::fs::read_to_string(&exported).await.unwrap();
        let records: Vec<ApplicationRecord> = serde_json::from_str(&text).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].imported);
        assert!(records[0].has_tag("time"));
        assert!(data_dir.join("records.json").exists());
    }

    #[tokio::test]
    async fn test_unknown_app_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let id = Uuid::new_v4().to_string();
        let favorite = cli(dir.path(), &["favorite", "--id", &id]);
        let err = run(favorite).await.unwrap_err();
        assert!(err.to_string().contains("no app with id"));
    }

    #[test]
    fn test_templates_reject_unknown_category() {
        assert!(print_templates("All").is_ok());
        assert!(print_templates("Gardening").is_err());
    }
}
