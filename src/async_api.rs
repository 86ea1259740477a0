use crate::{Engine, EngineConfig, Error, PageEvaluator, PageScript, Result};
use futures::future::BoxFuture;
use log::debug;
use std::sync::mpsc::{self, Sender};
use std::thread;
use tokio::sync::oneshot;

enum Command {
    Goto(String, oneshot::Sender<Result<()>>),
    EvalInPage(String, oneshot::Sender<Result<String>>),
    Close(oneshot::Sender<Result<()>>),
}

/// An async-friendly browser abstraction backed by a dedicated worker thread.
///
/// The worker thread owns a synchronous `Engine` instance and executes
/// commands sent from async tasks so callers can use an async interface
/// without requiring the engine to be `Send` across threads.
#[derive(Clone)]
pub struct Browser {
    cmd_tx: Sender<Command>,
}

/// A handle representing a page/context in the browser.
#[derive(Clone)]
pub struct Page {
    cmd_tx: Sender<Command>,
}

impl Browser {
    /// Create a new headless Chrome browser.
    #[cfg(feature = "cdp")]
    pub async fn new(config: Option<EngineConfig>) -> Result<Self> {
        Self::with_engine::<crate::cdp::CdpEngine>(config).await
    }

    /// Create a browser whose worker thread owns an engine of type `E`.
    pub async fn with_engine<E>(config: Option<EngineConfig>) -> Result<Self>
    where
        E: Engine + 'static,
    {
        let config = config.unwrap_or_default();

        let (cmd_tx, cmd_rx) = mpsc::channel::<Command>();
        let (init_tx, init_rx): (oneshot::Sender<Result<()>>, oneshot::Receiver<Result<()>>) =
            oneshot::channel();

        thread::spawn(move || {
            // Initialize engine on the worker thread
            let mut engine = match E::new(config) {
                Ok(e) => e,
                Err(err) => {
                    let _ = init_tx.send(Err(err));
                    return;
                }
            };

            let _ = init_tx.send(Ok(()));

            // Command loop
            while let Ok(cmd) = cmd_rx.recv() {
                match cmd {
                    Command::Goto(url, resp) => {
                        let res = engine.load_url(&url);
                        let _ = resp.send(res);
                    }
                    Command::EvalInPage(script, resp) => {
                        let res = engine.evaluate_script_in_page(&script);
                        let _ = resp.send(res);
                    }
                    Command::Close(resp) => {
                        let res = engine.close();
                        let _ = resp.send(res);
                        return;
                    }
                }
            }
            debug!("browser worker exiting: all handles dropped");
        });

        // Wait for the worker to report initialization success or failure
        let init_res = init_rx
            .await
            .map_err(|e| Error::Other(format!("Worker init canceled: {}", e)))?;
        init_res?;

        Ok(Self { cmd_tx })
    }

    /// Open a new page handle backed by the same worker thread.
    pub async fn new_page(&self) -> Result<Page> {
        Ok(Page {
            cmd_tx: self.cmd_tx.clone(),
        })
    }

    /// Shutdown the background worker and close the browser.
    pub async fn close(self) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Close(tx))
            .map_err(|_| Error::Other("Browser worker already stopped".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Close canceled: {}", e)))?
    }
}

impl Page {
    /// Navigate to a URL
    pub async fn goto(&self, url: &str) -> Result<()> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Goto(url.to_string(), tx))
            .map_err(|_| Error::LoadError("Browser worker stopped".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("Goto canceled: {}", e)))?
    }

    /// Evaluate script directly in the page's global context (can access `document` etc.)
    pub async fn eval_in_page(&self, script: &str) -> Result<String> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::EvalInPage(script.to_string(), tx))
            .map_err(|_| Error::ScriptError("Browser worker stopped".into()))?;
        rx.await
            .map_err(|e| Error::Other(format!("EvalInPage canceled: {}", e)))?
    }
}

impl PageEvaluator for Page {
    fn evaluate<'a>(&'a self, script: &'a PageScript) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { self.eval_in_page(&script.source()).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Answers every script with the script length, and fails on "throw".
    struct EchoEngine {
        url: Option<String>,
    }

    impl Engine for EchoEngine {
        fn new(_config: EngineConfig) -> Result<Self> {
            Ok(EchoEngine { url: None })
        }

        fn load_url(&mut self, url: &str) -> Result<()> {
            self.url = Some(url.to_string());
            Ok(())
        }

        fn evaluate_script_in_page(&mut self, script: &str) -> Result<String> {
            if script == "throw" {
                return Err(Error::ScriptError("thrown".into()));
            }
            Ok(format!("{}:{}", self.url.as_deref().unwrap_or(""), script.len()))
        }

        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    struct BrokenEngine;

    impl Engine for BrokenEngine {
        fn new(_config: EngineConfig) -> Result<Self> {
            Err(Error::InitializationError("no browser".into()))
        }

        fn load_url(&mut self, _url: &str) -> Result<()> {
            Ok(())
        }

        fn evaluate_script_in_page(&mut self, _script: &str) -> Result<String> {
            Ok(String::new())
        }

        fn close(self) -> Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn worker_runs_commands_in_order() {
        let browser = Browser::with_engine::<EchoEngine>(None).await.unwrap();
        let page = browser.new_page().await.unwrap();
        page.goto("https://x/").await.unwrap();
        assert_eq!(page.eval_in_page("abc").await.unwrap(), "https://x/:3");
        assert!(matches!(page.eval_in_page("throw").await, Err(Error::ScriptError(_))));

        let expected = PageScript::LoadedFonts.source().len();
        let via_trait = page.evaluate(&PageScript::LoadedFonts).await.unwrap();
        assert_eq!(via_trait, format!("https://x/:{}", expected));

        browser.close().await.unwrap();
        assert!(page.goto("https://y/").await.is_err());
    }

    #[tokio::test]
    async fn init_failure_is_reported() {
        let err = Browser::with_engine::<BrokenEngine>(None).await.err().unwrap();
        assert!(matches!(err, Error::InitializationError(_)));
    }
}
