use crate::application::use_cases::generate_testcases::GenerateTestCasesUseCase;
use crate::domain::error::AppError;
use crate::domain::testcase::TestCategory;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::llm_clients::LLMClient;
use actix_cors::Cors;
use actix_web::{dev::Server, get, post, web, App, HttpResponse, HttpServer, Responder};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use validator::Validate;

const MAX_LOG_ENTRIES: usize = 100;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LogEntry {
    pub time: String,
    pub level: String,
    pub source: String,
    pub message: String,
}

pub struct HttpState {
    pub config: AppConfig,
    pub llm_client: Arc<dyn LLMClient + Send + Sync>,
    pub generate_use_case: GenerateTestCasesUseCase,
    pub logs: Arc<Mutex<Vec<LogEntry>>>,
}

impl HttpState {
    pub fn new(config: AppConfig, llm_client: Arc<dyn LLMClient + Send + Sync>) -> Self {
        Self {
            generate_use_case: GenerateTestCasesUseCase::new(llm_client.clone()),
            llm_client,
            config,
            logs: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct GenerateRequest {
    #[validate(length(max = 8192))]
    pub story: String,
    #[serde(default)]
    pub categories: Vec<TestCategory>,
    #[serde(default)]
    pub language: Option<String>,
}

#[post("/generate")]
async fn generate(data: web::Data<HttpState>, req: web::Json<GenerateRequest>) -> impl Responder {
    let request_id = Uuid::new_v4();

    let story = req.story.trim();
    if story.is_empty() {
        add_log(
            &data.logs,
            "WARN",
            "HttpApi",
            &format!("request_id={} rejected: empty story", request_id),
        );
        return error_response(&AppError::ValidationError(
            "User story must not be empty.".to_string(),
        ));
    }
    if let Err(e) = req.validate() {
        add_log(
            &data.logs,
            "WARN",
            "HttpApi",
            &format!("request_id={} rejected: {}", request_id, e),
        );
        return error_response(&AppError::ValidationError(e.to_string()));
    }

    let categories = req
        .categories
        .iter()
        .map(|category| category.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "request_id={} generating test cases (categories=[{}] model={})",
            request_id, categories, data.config.llm.model
        ),
    );

    match data
        .generate_use_case
        .execute(
            &data.config.llm,
            story,
            &req.categories,
            req.language.as_deref().unwrap_or(""),
        )
        .await
    {
        Ok(result) => {
            add_log(
                &data.logs,
                "INFO",
                "HttpApi",
                &format!(
                    "request_id={} done (testcases={} personas={})",
                    request_id,
                    result.testcases.len(),
                    result.personas.len()
                ),
            );
            HttpResponse::Ok().json(result)
        }
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("request_id={} generation failed: {}", request_id, e),
            );
            error_response(&e)
        }
    }
}

#[post("/models")]
async fn list_models(data: web::Data<HttpState>) -> impl Responder {
    add_log(
        &data.logs,
        "INFO",
        "HttpApi",
        &format!(
            "Fetching models (provider={:?} base_url={})",
            data.config.llm.provider, data.config.llm.base_url
        ),
    );

    match data.llm_client.list_models(&data.config.llm).await {
        Ok(models) => HttpResponse::Ok().json(models),
        Err(e) => {
            add_log(
                &data.logs,
                "ERROR",
                "HttpApi",
                &format!("Failed to list models: {}", e),
            );
            error_response(&e)
        }
    }
}

#[get("/health")]
async fn health() -> impl Responder {
    HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

#[get("/logs")]
async fn get_logs(data: web::Data<HttpState>) -> impl Responder {
    let logs = data.logs.lock().unwrap();
    HttpResponse::Ok().json(&*logs)
}

/// Maps the error taxonomy to status codes; the body is the display string
/// the front-end shows verbatim.
fn error_response(err: &AppError) -> HttpResponse {
    match err {
        AppError::ValidationError(_) => HttpResponse::BadRequest().body(err.to_string()),
        AppError::ParseError(_) => HttpResponse::BadGateway().body(err.to_string()),
        _ => HttpResponse::InternalServerError().body(err.to_string()),
    }
}

pub fn add_log_entry(
    logs: &Mutex<Vec<LogEntry>>,
    level: &str,
    source: &str,
    message: &str,
) -> LogEntry {
    let entry = LogEntry {
        time: Local::now().format("%H:%M:%S").to_string(),
        level: level.to_string(),
        source: source.to_string(),
        message: message.to_string(),
    };
    let mut logs = logs.lock().unwrap();
    logs.push(entry.clone());
    if logs.len() > MAX_LOG_ENTRIES {
        logs.remove(0);
    }
    entry
}

pub fn add_log(logs: &Mutex<Vec<LogEntry>>, level: &str, source: &str, message: &str) {
    add_log_entry(logs, level, source, message);
}

pub fn start_server(state: HttpState) -> std::io::Result<Server> {
    let bind = (state.config.server.host.clone(), state.config.server.port);
    let state = web::Data::new(state);

    let server = HttpServer::new(move || {
        let cors = Cors::permissive(); // Allow all origins for local tool

        App::new().wrap(cors).app_data(state.clone()).service(
            web::scope("/api")
                .service(generate)
                .service(list_models)
                .service(health)
                .service(get_logs),
        )
    })
    .bind(bind)?
    .run();

    Ok(server)
}
