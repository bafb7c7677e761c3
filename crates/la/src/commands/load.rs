//! `la load` command implementation.

use clap::Args;

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the load command.
#[derive(Args)]
pub(crate) struct LoadArgs {
    /// URL of the document, e.g. `/guide/intro`.
    url: String,

    /// Print only the rendered body instead of the document as JSON.
    #[arg(long)]
    body: bool,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl LoadArgs {
    /// Execute the load command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or the document cannot be loaded.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let site = self.site.open()?;
        let doc = site.load(&self.url).await?;

        output.document("Loaded", &doc);
        for url in doc.reference_urls() {
            output.field("references", &doc.qualify_url(url));
        }

        if self.body {
            output.data(doc.body());
        } else {
            output.data(&serde_json::to_string_pretty(&*doc)?);
        }
        Ok(())
    }
}
