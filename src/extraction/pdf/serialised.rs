//! Serialises access to a [TableReader] that must stay on one thread.

use std::{
    path::{Path, PathBuf},
    sync::mpsc,
    thread,
};

use anyhow::{Context, Result, anyhow};

use super::{ExtractedTables, TableReader};
use crate::mpscutil;

struct Request {
    pdf_path: PathBuf,
    template_json: String,
    response_sender: mpsc::SyncSender<Result<ExtractedTables>>,
}

/// Requests coarsely serialised table reads from a [TableReader] owned by a
/// dedicated worker thread. Can be shared between threads.
pub struct SerialisedTableReader {
    request_sender: mpsc::SyncSender<Request>,
    worker: thread::JoinHandle<()>,
}

impl SerialisedTableReader {
    /// Starts the worker thread, which creates its [TableReader] using
    /// `make_reader`. Returns once the reader has been created.
    pub fn spawn<F>(make_reader: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Box<dyn TableReader>> + Send + 'static,
    {
        let (request_sender, request_receiver) = mpsc::sync_channel::<Request>(0);
        let (ready_sender, ready_receiver) = mpsc::sync_channel::<Result<()>>(1);

        let worker = thread::Builder::new()
            .name("table-reader".to_string())
            .spawn(move || {
                let reader = match make_reader() {
                    Ok(reader) => {
                        mpscutil::send_or_log_warning(&ready_sender, "reader ready", Ok(()));
                        reader
                    }
                    Err(err) => {
                        mpscutil::send_or_log_warning(&ready_sender, "reader ready", Err(err));
                        return;
                    }
                };
                drop(ready_sender);
                run(reader.as_ref(), request_receiver);
            })
            .with_context(|| "spawning table reader thread")?;

        ready_receiver
            .recv()
            .map_err(|_| anyhow!("table reader thread exited during startup"))?
            .with_context(|| "creating table reader")?;

        Ok(Self {
            request_sender,
            worker,
        })
    }

    /// Stops the worker thread and waits for it to exit.
    pub fn close(self) -> Result<()> {
        drop(self.request_sender);
        self.worker
            .join()
            .map_err(|_| anyhow!("table reader thread panicked"))
    }
}

impl TableReader for SerialisedTableReader {
    fn read_pdf_with_template(
        &self,
        pdf_path: &Path,
        template_json: &str,
    ) -> Result<ExtractedTables> {
        let (response_sender, response_receiver) = mpsc::sync_channel(0);
        self.request_sender
            .send(Request {
                pdf_path: pdf_path.to_owned(),
                template_json: template_json.to_string(),
                response_sender,
            })
            .map_err(|_| anyhow!("table reader thread has stopped"))?;
        response_receiver
            .recv()
            .map_err(|_| anyhow!("table reader thread dropped the request"))?
    }
}

fn run(reader: &dyn TableReader, request_receiver: mpsc::Receiver<Request>) {
    loop {
        let request = match request_receiver.recv() {
            Ok(request) => request,
            Err(_) => {
                log::info!("Request channel closed; terminating table reader worker loop.");
                return;
            }
        };

        let result = reader.read_pdf_with_template(&request.pdf_path, &request.template_json);
        mpscutil::send_or_log_warning(
            &request.response_sender,
            "read_pdf_with_template response",
            result,
        );
    }
}
