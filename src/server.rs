use crate::config::RelayConfig;
use crate::error::RequestError;
use crate::history::SessionId;
use crate::io_struct::{ChatReqInput, ChatTurn, IMAGE_MAX_BYTES, ImagePayload};
use crate::registry;
use crate::relay_state::RelayState;
use actix_multipart::{Field, Multipart};
use actix_web::{HttpRequest, HttpResponse, HttpServer, get, post, web};
use futures_util::StreamExt;
use std::io::Write;

#[get("/health")]
pub async fn health(_req: HttpRequest, _: web::Data<RelayState>) -> HttpResponse {
    HttpResponse::Ok().body("Ok")
}

#[get("/models")]
pub async fn models(_req: HttpRequest, _: web::Data<RelayState>) -> HttpResponse {
    HttpResponse::Ok().json(registry::list_models())
}

#[post("/chat")]
pub async fn chat(
    req: HttpRequest,
    payload: web::Payload,
    app_state: web::Data<RelayState>,
) -> Result<HttpResponse, crate::error::RelayError> {
    let turn = read_chat_turn(&req, payload).await?;
    let session_id = turn.session_id.map(SessionId::from).unwrap_or_default();
    let model_id = turn
        .model
        .unwrap_or_else(|| registry::DEFAULT_MODEL_ID.to_string());
    let message = turn.message.unwrap_or_default();
    let chunks = app_state
        .dispatch(&session_id, &model_id, &message, turn.image)
        .await?;
    Ok(HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .streaming(chunks))
}

/// Normalize the request body, accepting either JSON or multipart form data
async fn read_chat_turn(
    req: &HttpRequest,
    payload: web::Payload,
) -> Result<ChatTurn, RequestError> {
    let content_type = req
        .headers()
        .get(actix_web::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    if content_type.starts_with("multipart/form-data") {
        read_multipart_turn(Multipart::new(req.headers(), payload)).await
    } else {
        read_json_turn(payload).await
    }
}

async fn read_json_turn(mut payload: web::Payload) -> Result<ChatTurn, RequestError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk.map_err(|e| RequestError::MalformedPayload {
            reason: e.to_string(),
        })?;
        body.extend_from_slice(&chunk);
    }
    if body.is_empty() {
        return Ok(ChatTurn::default());
    }
    let input: ChatReqInput =
        serde_json::from_slice(&body).map_err(|e| RequestError::MalformedPayload {
            reason: e.to_string(),
        })?;
    input.into_turn()
}

async fn read_multipart_turn(mut multipart: Multipart) -> Result<ChatTurn, RequestError> {
    let mut turn = ChatTurn::default();
    while let Some(field) = multipart.next().await {
        let mut field = field.map_err(|e| RequestError::MalformedPayload {
            reason: e.to_string(),
        })?;
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "message" => turn.message = Some(read_text_field(&mut field).await?),
            "sessionId" => turn.session_id = Some(read_text_field(&mut field).await?),
            "model" => turn.model = Some(read_text_field(&mut field).await?),
            "image" => {
                let mime = field
                    .content_type()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| "application/octet-stream".to_string());
                let data = read_binary_field(&mut field, IMAGE_MAX_BYTES).await?;
                turn.image = Some(ImagePayload { data, mime });
            }
            _ => {
                // drain unexpected fields so the multipart stream stays parsable
                while let Some(chunk) = field.next().await {
                    chunk.map_err(|e| RequestError::MalformedPayload {
                        reason: e.to_string(),
                    })?;
                }
            }
        }
    }
    Ok(turn)
}

async fn read_text_field(field: &mut Field) -> Result<String, RequestError> {
    let data = read_binary_field(field, IMAGE_MAX_BYTES).await?;
    String::from_utf8(data).map_err(|e| RequestError::MalformedPayload {
        reason: e.to_string(),
    })
}

/// Collect a field body, rejecting it once it crosses `limit` bytes
async fn read_binary_field(field: &mut Field, limit: usize) -> Result<Vec<u8>, RequestError> {
    let mut data = Vec::new();
    while let Some(chunk) = field.next().await {
        let chunk = chunk.map_err(|e| RequestError::MalformedPayload {
            reason: e.to_string(),
        })?;
        if data.len() + chunk.len() > limit {
            return Err(RequestError::ImageTooLarge { limit });
        }
        data.extend_from_slice(&chunk);
    }
    Ok(data)
}

pub async fn periodic_logging(app_state: RelayState) {
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(app_state.log_interval)).await;
        let (sessions, messages) = app_state.store.stats().await;
        log::info!("Active sessions: {}, stored messages: {}", sessions, messages);
    }
}

// default level is info
pub fn init_logging() {
    env_logger::Builder::new()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} - {} - {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .filter(None, log::LevelFilter::Info)
        .init();
}

pub async fn startup(config: RelayConfig, app_state: RelayState) -> std::io::Result<()> {
    let app_state = web::Data::new(app_state);

    println!("Starting server at {}:{}", config.host, config.port);

    HttpServer::new(move || {
        actix_web::App::new()
            .wrap(actix_web::middleware::Logger::default())
            .app_data(app_state.clone())
            .service(health)
            .service(models)
            .service(chat)
    })
    .bind((config.host, config.port))?
    .run()
    .await?;

    std::io::Result::Ok(())
}
