use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use internhub_server::config::ServerConfig;
use internhub_server::state::AppState;
use internhub_server::build_router;
use internhub_test_utils::{
    Fixture, ADMIN_EMAIL, ADMIN_PASSWORD, INTERN_PASSWORD, UNIVERSITY_PASSWORD,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use tower::ServiceExt;

const BOUNDARY: &str = "internhub-test-boundary";

fn app(fx: &Fixture) -> Router {
    build_router(AppState::new(fx.hub.clone()), &ServerConfig::default())
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn login(app: &Router, email: &str, password: &str) -> String {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": email, "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    body["token"].as_str().unwrap().to_string()
}

fn multipart(
    file_name: &str,
    content_type: &str,
    bytes: &[u8],
    fields: &[(&str, &str)],
) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn upload_request(token: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri("/api/documents")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let fx = Fixture::new();
    let (status, body) = send(&app(&fx), request(Method::GET, "/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_login_and_me() {
    let fx = Fixture::new();
    let app = app(&fx);
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(&app, request(Method::GET, "/api/auth/me", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], ADMIN_EMAIL);
    assert_eq!(body["role"], "ADMIN");
    assert!(body.get("passwordHash").is_none());
}

#[tokio::test]
async fn test_error_body_shape() {
    let fx = Fixture::new();
    let app = app(&fx);

    let (status, body) = send(&app, request(Method::GET, "/api/users", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["statusCode"], 401);
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert!(body["message"].is_string());
    assert!(body["timestamp"].is_string());

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": ADMIN_EMAIL, "password": "wrong-pass-1" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], "UNAUTHORIZED");

    let (status, body) = send(&app, request(Method::GET, "/api/nope", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_requests_are_validation_errors() {
    let fx = Fixture::new();
    let app = app(&fx);
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/universities")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{ not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/universities/not-a-uuid", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_list_pagination() {
    let fx = Fixture::new();
    fx.other_university();
    let app = app(&fx);
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/universities?page=2&limit=1", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["page"], 2);
    assert_eq!(body["totalPages"], 2);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);

    let (_, body) = send(
        &app,
        request(Method::GET, "/api/universities?search=another", Some(&token), None),
    )
    .await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["code"], "AU");
}

#[tokio::test]
async fn test_application_review_flow() {
    let fx = Fixture::new();
    let app = app(&fx);
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let registrar = login(&app, "registrar@uot.test", UNIVERSITY_PASSWORD).await;

    let (status, application) = send(
        &app,
        request(
            Method::POST,
            "/api/applications",
            Some(&registrar),
            Some(json!({
                "title": "Summer cohort",
                "academicYear": "2025/2026",
                "startDate": "2026-07-01",
                "endDate": "2026-09-30",
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{application}");
    assert_eq!(application["status"], "PENDING");
    let app_id = application["id"].as_str().unwrap().to_string();

    let (status, student) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/applications/{app_id}/students"),
            Some(&registrar),
            Some(json!({
                "fullName": "Ada Lovelace",
                "email": "ada@uot.test",
                "fieldOfStudy": "Mathematics",
                "preferredDepartmentId": fx.department.id,
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{student}");
    let student_id = student["id"].as_str().unwrap().to_string();

    let (_, listed) = send(
        &app,
        request(
            Method::GET,
            &format!("/api/applications/{app_id}/students"),
            Some(&registrar),
            None,
        ),
    )
    .await;
    assert_eq!(listed["total"], 1);

    // university accounts cannot review
    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/applications/{app_id}/review"),
            Some(&registrar),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/applications/{app_id}/review"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "UNDER_REVIEW");

    // a student is still pending review
    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/applications/{app_id}/approve"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "PRECONDITION_FAILED");

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/students/{student_id}/accept"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ACCEPTED");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/applications/{app_id}/approve"),
            Some(&admin),
            Some(json!({ "notes": "welcome" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "APPROVED");

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/applications/{app_id}/review"), Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], "INVALID_STATUS_TRANSITION");

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/students/{student_id}/schedule-arrival"),
            Some(&admin),
            Some(json!({ "arrivalDate": "2026-07-01" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "AWAITING_ARRIVAL");

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/students/{student_id}/mark-arrived"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, account) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/students/{student_id}/create-account"),
            Some(&admin),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{account}");
    assert_eq!(account["intern"]["status"], "ACTIVE");
    let temporary = account["temporaryPassword"].as_str().unwrap();
    let intern_token = login(&app, "ada@uot.test", temporary).await;

    let (status, body) =
        send(&app, request(Method::GET, "/api/interns", Some(&intern_token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn test_submission_review_over_http() {
    let fx = Fixture::new();
    fx.active_intern("ada@uot.test");
    let app = app(&fx);
    let intern = login(&app, "ada@uot.test", INTERN_PASSWORD).await;
    let supervisor = login(
        &app,
        "supervisor@internhub.test",
        internhub_test_utils::SUPERVISOR_PASSWORD,
    )
    .await;

    let (status, submission) = send(
        &app,
        request(
            Method::POST,
            "/api/submissions",
            Some(&intern),
            Some(json!({ "title": "Week 1", "kind": "WEEKLY_REPORT" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{submission}");
    let id = submission["id"].as_str().unwrap().to_string();

    send(
        &app,
        request(Method::POST, &format!("/api/submissions/{id}/review"), Some(&supervisor), None),
    )
    .await;

    // feedback is required to reject
    let (status, _) = send(
        &app,
        request(Method::POST, &format!("/api/submissions/{id}/reject"), Some(&supervisor), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            &format!("/api/submissions/{id}/reject"),
            Some(&supervisor),
            Some(json!({ "feedback": "more detail" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["feedback"], "more detail");

    let (status, body) = send(
        &app,
        request(Method::POST, &format!("/api/submissions/{id}/resubmit"), Some(&intern), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "SUBMITTED");
    assert_eq!(body["resubmissionCount"], 1);
}

#[tokio::test]
async fn test_document_upload_and_download() {
    let fx = Fixture::new();
    let app = app(&fx);
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let university_id = fx.university.id.to_string();

    let body = multipart(
        "My CV.pdf",
        "application/pdf",
        b"%PDF-1.7 http",
        &[("category", "cv"), ("universityId", &university_id)],
    );
    let (status, doc) = send(&app, upload_request(&token, body)).await;
    assert_eq!(status, StatusCode::CREATED, "{doc}");
    assert_eq!(doc["category"], "CV");
    assert_eq!(doc["sizeBytes"], 13);
    assert_eq!(doc["links"]["universityId"], university_id.as_str());
    let id = doc["id"].as_str().unwrap().to_string();

    let resp = app
        .clone()
        .oneshot(request(
            Method::GET,
            &format!("/api/documents/{id}/download"),
            Some(&token),
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("My_CV.pdf"), "{disposition}");
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    assert_eq!(&bytes[..], b"%PDF-1.7 http");

    let (status, _) = send(
        &app,
        request(Method::DELETE, &format!("/api/documents/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        request(Method::GET, &format!("/api/documents/{id}"), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upload_rejections() {
    let fx = Fixture::new();
    let app = app(&fx);
    let token = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;

    let body = multipart("page.html", "text/html", b"<html></html>", &[]);
    let (status, body) = send(&app, upload_request(&token, body)).await;
    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert_eq!(body["code"], "UNSUPPORTED_MEDIA_TYPE");

    let body = multipart("a.pdf", "application/pdf", b"%PDF", &[("category", "selfie")]);
    let (status, _) = send(&app, upload_request(&token, body)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing_file = format!(
        "--{BOUNDARY}\r\n\
         Content-Disposition: form-data; name=\"notes\"\r\n\r\n\
         hi\r\n--{BOUNDARY}--\r\n"
    );
    let (status, body) = send(&app, upload_request(&token, missing_file.into_bytes())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_audit_and_dashboard_are_admin_scoped() {
    let fx = Fixture::new();
    fx.pending_application();
    let app = app(&fx);
    let admin = login(&app, ADMIN_EMAIL, ADMIN_PASSWORD).await;
    let registrar = login(&app, "registrar@uot.test", UNIVERSITY_PASSWORD).await;

    let (status, events) = send(
        &app,
        request(Method::GET, "/api/audit?entity=application", Some(&admin), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(events.as_array().unwrap().len(), 1);

    let (status, report) =
        send(&app, request(Method::GET, "/api/audit/verify", Some(&admin), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["valid"], true);

    let (status, _) = send(&app, request(Method::GET, "/api/audit", Some(&registrar), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, summary) = send(
        &app,
        request(Method::GET, "/api/dashboard/summary", Some(&registrar), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["universityId"], fx.university.id.to_string().as_str());
    assert_eq!(summary["applications"]["PENDING"], 1);
}
