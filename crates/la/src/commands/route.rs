//! `la route` command implementation.

use clap::Args;
use la_site::{Dispatch, RequestTarget};

use super::SiteArgs;
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the route command.
#[derive(Args)]
pub(crate) struct RouteArgs {
    /// Request path with optional query, e.g. `/old/page?x=1`.
    path: String,

    /// Request method.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request scheme, used by rules matching absolute URLs.
    #[arg(long, default_value = "http")]
    scheme: String,

    /// Request host, used by rules matching absolute URLs.
    #[arg(long, default_value = "localhost")]
    host: String,

    #[command(flatten)]
    pub site: SiteArgs,
}

impl RouteArgs {
    /// Execute the route command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration fails or loading fails with anything
    /// other than not-found.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let site = self.site.open()?;
        let target = RequestTarget::new(self.scheme, self.host, self.path);

        match site.handle(&self.method, &target).await? {
            Dispatch::Pass => output.warning("Pass: not a content request"),
            Dispatch::Redirect(url) => output.forward("Redirect", &url),
            Dispatch::Proxy(url) => output.forward("Proxy", &url),
            Dispatch::NotFound => output.warning("Not found"),
            Dispatch::Render(doc) => {
                output.document("Render", &doc);
                if let Some(title) = doc.title() {
                    output.field("title", title);
                }
            }
        }
        Ok(())
    }
}
