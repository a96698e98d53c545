use std::net::SocketAddr;

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::headers::authorization::{Authorization, Basic};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::{Form, Router, TypedHeader};
use serde::Deserialize;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::db::Database;
use crate::error::ApiError;
use crate::highlight::{Highlighter, Rendered, Target};
use crate::models::{Account, Paste};
use crate::App;

/// The manual for the program in man page form.
const MAN_PAGE: &str = include_str!("../../assets/man.txt");

const RECENT_PASTES_LIMIT: i64 = 10;

pub async fn run(app: App) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], app.config.port));

    let router = Router::new()
        .route("/", get(index).post(create_paste))
        .route(
            "/:token",
            get(read_paste).delete(delete_paste).patch(update_paste),
        )
        .route("/:token/", get(read_paste_colored)) // hack
        .route("/:token/:lexer", get(read_paste_with_lexer))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(
            app.config.limits.max_upload_size,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(app);

    axum::Server::bind(&addr)
        .serve(router.into_make_service())
        .await?;

    Ok(())
}

type Credentials = Option<TypedHeader<Authorization<Basic>>>;

/// Clients announcing themselves as Mozilla descendants get markup; everyone
/// else is assumed to be curl-like.
fn is_browser(headers: &HeaderMap) -> bool {
    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|ua| ua.starts_with("Mozilla"))
        .unwrap_or(false)
}

/// Optional identification: resolve credentials to an account via lazy
/// signup, or to nothing when no credentials were sent.
async fn identify(db: &Database, credentials: &Credentials) -> crate::ApiResult<Option<Account>> {
    match credentials {
        Some(TypedHeader(auth)) => {
            let account = db.get_auth(auth.username(), auth.password()).await?;
            Ok(Some(account))
        }
        None => Ok(None),
    }
}

/// Required authentication for privileged operations. Fails closed: the
/// account must already exist, and an unknown handle is reported as bad
/// credentials rather than lazily created.
async fn authenticate(db: &Database, credentials: &Credentials) -> crate::ApiResult<Account> {
    let Some(TypedHeader(auth)) = credentials else {
        return Err(ApiError::InvalidCredentials);
    };
    db.signin(auth.username(), auth.password())
        .await
        .map_err(|e| match e {
            ApiError::NotFound => ApiError::InvalidCredentials,
            e => e,
        })
}

/// Load a paste and enforce the visibility policy. Pastes the requester may
/// not read are indistinguishable from absent ones.
async fn fetch_readable(
    db: &Database,
    token: &str,
    credentials: &Credentials,
) -> crate::ApiResult<Paste> {
    let paste = db.get_paste_by_token(token).await?;
    let requester = identify(db, credentials).await?;
    if !paste.readable_by(requester.map(|a| a.id)) {
        return Err(ApiError::NotFound);
    }
    Ok(paste)
}

fn rendered_response(rendered: Rendered) -> crate::ApiResult<Response> {
    match rendered {
        Rendered::Markup { html, css } => Ok(Html(format!(
            "<!DOCTYPE html>\n<html><head><style>{css}</style></head>\
             <body><pre class=\"code\">{html}</pre></body></html>"
        ))
        .into_response()),
        Rendered::Terminal(text) => Ok(text.into_response()),
    }
}

async fn index(
    State(db): State<Database>,
    headers: HeaderMap,
    credentials: Credentials,
) -> crate::ApiResult<Response> {
    let mut body = MAN_PAGE.to_string();

    if let Some(account) = identify(&db, &credentials).await? {
        let pastes = db
            .list_pastes_by_owner(account.id, RECENT_PASTES_LIMIT)
            .await?;
        body.push_str(&format!("\nRECENT PASTES ({})\n", account.account_id));
        for paste in pastes {
            body.push_str(&format!(
                "    /{}  {}\n",
                paste.token,
                paste.updated_at.format("%Y-%m-%d %H:%M:%S")
            ));
        }
    }

    if is_browser(&headers) {
        Ok(Html(format!("<pre style=\"white-space: pre\">{body}</pre>")).into_response())
    } else {
        Ok(body.into_response())
    }
}

#[derive(Debug, Deserialize)]
struct PasteForm {
    f: Option<String>,
    public: Option<u8>,
}

async fn create_paste(
    State(config): State<Config>,
    State(db): State<Database>,
    headers: HeaderMap,
    credentials: Credentials,
    Form(form): Form<PasteForm>,
) -> crate::ApiResult<Response> {
    let document = form
        .f
        .filter(|f| !f.is_empty())
        .ok_or(ApiError::MissingField("f"))?;
    let public = form.public.map(|p| p != 0).unwrap_or(true);

    let owner = identify(&db, &credentials).await?;
    let paste = db
        .add_paste(
            &document,
            public,
            owner.map(|a| a.id),
            config.paste.token_length,
        )
        .await?;

    if is_browser(&headers) {
        let response = (
            StatusCode::FOUND,
            [(header::LOCATION, format!("/{}", paste.token))],
        );
        Ok(response.into_response())
    } else {
        Ok(format!("{}/{}\n", config.base_url, paste.token).into_response())
    }
}

async fn read_paste(
    State(db): State<Database>,
    State(highlighter): State<Highlighter>,
    headers: HeaderMap,
    credentials: Credentials,
    Path(token): Path<String>,
) -> crate::ApiResult<Response> {
    let paste = fetch_readable(&db, &token, &credentials).await?;

    if is_browser(&headers) {
        let syntax = highlighter.resolve(None, &paste.document);
        rendered_response(highlighter.render(&paste.document, syntax, Target::Markup)?)
    } else {
        Ok(paste.document.into_response())
    }
}

async fn read_paste_colored(
    State(db): State<Database>,
    State(highlighter): State<Highlighter>,
    headers: HeaderMap,
    credentials: Credentials,
    Path(token): Path<String>,
) -> crate::ApiResult<Response> {
    let paste = fetch_readable(&db, &token, &credentials).await?;

    let syntax = highlighter.resolve(None, &paste.document);
    let target = if is_browser(&headers) {
        Target::Markup
    } else {
        Target::Terminal
    };
    rendered_response(highlighter.render(&paste.document, syntax, target)?)
}

async fn read_paste_with_lexer(
    State(db): State<Database>,
    State(highlighter): State<Highlighter>,
    headers: HeaderMap,
    credentials: Credentials,
    Path((token, lexer_name)): Path<(String, String)>,
) -> crate::ApiResult<Response> {
    let paste = fetch_readable(&db, &token, &credentials).await?;

    let syntax = highlighter.resolve(Some(&lexer_name), &paste.document);
    let target = if is_browser(&headers) {
        Target::Markup
    } else {
        Target::Terminal
    };
    rendered_response(highlighter.render(&paste.document, syntax, target)?)
}

async fn delete_paste(
    State(db): State<Database>,
    credentials: Credentials,
    Path(token): Path<String>,
) -> crate::ApiResult<StatusCode> {
    let account = authenticate(&db, &credentials).await?;

    let paste = db.get_paste_by_token(&token).await?;
    if !paste.owned_by(Some(account.id)) {
        return Err(ApiError::NotFound);
    }

    db.soft_delete_paste(paste.id).await?;
    Ok(StatusCode::OK)
}

async fn update_paste(
    State(db): State<Database>,
    credentials: Credentials,
    Path(token): Path<String>,
    Form(form): Form<PasteForm>,
) -> crate::ApiResult<StatusCode> {
    if form.f.is_none() && form.public.is_none() {
        return Err(ApiError::MissingField("f or public"));
    }

    let account = authenticate(&db, &credentials).await?;

    let paste = db.get_paste_by_token(&token).await?;
    if !paste.owned_by(Some(account.id)) {
        return Err(ApiError::NotFound);
    }

    if let Some(document) = &form.f {
        db.update_paste_document(paste.id, document).await?;
    }
    if let Some(public) = form.public {
        db.update_paste_visibility(paste.id, public != 0).await?;
    }

    Ok(StatusCode::OK)
}
