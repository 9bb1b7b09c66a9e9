//! HTTP server implementation
//!
//! hyper http1 with TokioIo, one spawned task per connection, and a
//! match-based router. Requests are handled independently and
//! statelessly; the only shared state is the persistence layer behind
//! `AppState`.

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response};
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::config::Args;
use crate::db::MongoClient;
use crate::notify::CompletionNotifier;
use crate::routes::{self, BoxBody, FormAction};
use crate::tokens::{CaseStore, SubmissionFinalizer, TokenStore, TokenValidator};
use crate::types::{Result, SignetError};
use crate::vault::{DocumentCipher, DocumentVault};

/// Shared application state
///
/// Constructed once in `main` with an explicit persistence handle; no
/// lazily-initialized globals.
pub struct AppState {
    pub args: Args,
    pub mongo: MongoClient,
    pub tokens: TokenStore,
    pub validator: TokenValidator,
    pub finalizer: SubmissionFinalizer,
    pub vault: DocumentVault,
    pub cases: CaseStore,
}

impl AppState {
    /// Wire up stores and services over a connected MongoDB client
    pub async fn new(
        args: Args,
        mongo: MongoClient,
        notifier: Arc<dyn CompletionNotifier>,
    ) -> Result<Self> {
        let cipher = if args.document_key.is_some() {
            let table = args
                .key_table()
                .map_err(SignetError::Config)?;
            Arc::new(DocumentCipher::from_hex_table(
                &table,
                args.document_key_version,
            )?)
        } else {
            warn!("No DOCUMENT_KEY configured; using an ephemeral dev key");
            Arc::new(DocumentCipher::ephemeral())
        };

        let tokens = TokenStore::new(&mongo, args.public_url.clone()).await?;
        let cases = CaseStore::new(&mongo).await?;
        let vault = DocumentVault::new(
            &mongo,
            cipher,
            args.storage_root.clone(),
            args.public_url.clone(),
        )
        .await?;

        let validator = TokenValidator::new(tokens.clone());
        let finalizer = SubmissionFinalizer::new(
            tokens.clone(),
            vault.clone(),
            cases.clone(),
            notifier,
        );

        Ok(Self {
            args,
            mongo,
            tokens,
            validator,
            finalizer,
            vault,
            cases,
        })
    }
}

/// Start the HTTP server
pub async fn run(state: Arc<AppState>) -> Result<()> {
    let listener = TcpListener::bind(state.args.listen).await?;

    info!("Signet listening on {}", state.args.listen);

    if state.args.dev_mode {
        warn!("Development mode enabled - API key checks may be disabled");
    }

    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                let state = Arc::clone(&state);
                tokio::spawn(async move {
                    let io = TokioIo::new(stream);

                    let service = service_fn(move |req| {
                        let state = Arc::clone(&state);
                        async move { handle_request(state, addr, req).await }
                    });

                    if let Err(err) = http1::Builder::new()
                        .serve_connection(io, service)
                        .await
                    {
                        error!("Error serving connection from {}: {:?}", addr, err);
                    }
                });
            }
            Err(e) => {
                error!("Error accepting connection: {:?}", e);
            }
        }
    }
}

/// Route incoming HTTP requests
async fn handle_request(
    state: Arc<AppState>,
    addr: SocketAddr,
    req: Request<Incoming>,
) -> std::result::Result<Response<BoxBody>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    info!("[{}] {} {}", addr, method, path);

    let response = match (method, path.as_str()) {
        // Liveness probe
        (Method::GET, "/health") | (Method::GET, "/healthz") => routes::health_check(),

        // Readiness probe - 200 only if MongoDB answers
        (Method::GET, "/ready") | (Method::GET, "/readyz") => {
            routes::readiness_check(Arc::clone(&state)).await
        }

        // Version info for deployment verification
        (Method::GET, "/version") => routes::version_info(),

        // CORS preflight
        (Method::OPTIONS, _) => routes::preflight_response(),

        // Token classification for the signing page
        (Method::POST, "/validate-token") => {
            routes::handle_validate_token(req, Arc::clone(&state)).await
        }

        // First-open stamp
        (Method::POST, "/mark-accessed") => {
            routes::handle_mark_accessed(req, Arc::clone(&state)).await
        }

        // Token issuance from the case workflow
        (Method::POST, "/api/v1/tokens") => {
            routes::handle_issue_token(req, Arc::clone(&state)).await
        }

        // Whole-case token cleanup
        (Method::DELETE, p) if p.starts_with("/api/v1/cases/") && p.ends_with("/tokens") => {
            let case_number = p
                .strip_prefix("/api/v1/cases/")
                .and_then(|s| s.strip_suffix("/tokens"))
                .unwrap_or("");
            routes::handle_delete_case_tokens(req, Arc::clone(&state), case_number).await
        }

        // Signer-facing form routes: /forms/{docType}/{token}/{draft|submit}
        (Method::POST, p) if p.starts_with("/forms/") => {
            match routes::match_form_route(p) {
                Some((doc_type, token, FormAction::Draft)) => {
                    let (doc_type, token) = (doc_type.to_string(), token.to_string());
                    routes::handle_draft(req, Arc::clone(&state), &doc_type, &token).await
                }
                Some((doc_type, token, FormAction::Submit)) => {
                    let (doc_type, token) = (doc_type.to_string(), token.to_string());
                    routes::handle_submit(req, Arc::clone(&state), &doc_type, &token).await
                }
                None => routes::not_found_response(p),
            }
        }

        // Decrypted artifact retrieval: /documents/{caseId}/{documentId}
        (Method::GET, p) if p.starts_with("/documents/") => {
            let rest = p.strip_prefix("/documents/").unwrap_or("");
            let mut parts = rest.split('/');
            match (parts.next(), parts.next(), parts.next()) {
                (Some(case_id), Some(document_id), None)
                    if !case_id.is_empty() && !document_id.is_empty() =>
                {
                    let (case_id, document_id) = (case_id.to_string(), document_id.to_string());
                    routes::handle_get_document(req, Arc::clone(&state), &case_id, &document_id)
                        .await
                }
                _ => routes::not_found_response(p),
            }
        }

        (_, p) => routes::not_found_response(p),
    };

    Ok(response)
}
