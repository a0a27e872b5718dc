// Integration tests for the meeting client
// A warp server on an ephemeral port stands in for the meeting backend and
// records every request it receives

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use tokio::time::{sleep, timeout, Duration};
use warp::http::StatusCode;
use warp::{Filter, Reply};

use meeting_room_client::account::{PasswordReset, ResetStep};
use meeting_room_client::api::types::{JoiningUser, User};
use meeting_room_client::report::MeetingReport;
use meeting_room_client::room::{Exit, SyntheticSource};
use meeting_room_client::sdk::{CallJournal, HeadlessChatClient, HeadlessVideoClient};
use meeting_room_client::{
    BackendClient, Config, MeetError, MeetingRoom, MemoryTokenStore, Role, RoomServices,
    SessionResolver, TokenStore,
};

const GOOD_TOKEN: &str = "good-token";

/// One request seen by the mock backend
#[derive(Debug, Clone)]
struct Seen {
    path: String,
    body: Value,
    authed: bool,
}

#[derive(Default)]
struct Recorder {
    seen: Mutex<Vec<Seen>>,
}

impl Recorder {
    fn record(&self, path: &str, body: Value, auth: &Option<String>) {
        self.seen.lock().unwrap().push(Seen {
            path: path.to_string(),
            body,
            authed: auth.is_some(),
        });
    }

    fn count(&self, path: &str) -> usize {
        self.seen.lock().unwrap().iter().filter(|s| s.path == path).count()
    }

    fn bodies(&self, path: &str) -> Vec<Value> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.path == path)
            .map(|s| s.body.clone())
            .collect()
    }

    fn all(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

fn authorized(auth: &Option<String>) -> bool {
    auth.as_deref() == Some(&format!("Bearer {}", GOOD_TOKEN))
}

fn unauthorized() -> warp::reply::Response {
    warp::reply::with_status("invalid token", StatusCode::UNAUTHORIZED).into_response()
}

fn graphql_reply(query: &str) -> Value {
    if query.contains("getMeetingById(id: 404)") {
        return json!({ "data": { "getMeetingById": null } });
    }
    if query.contains("getMeetingById(id: 500)") {
        return json!({ "data": null, "errors": [{ "message": "boom" }] });
    }
    if query.contains("{ id hostId }") {
        // Meeting 13 is hosted by the signed-in user
        let host = if query.contains("(id: 13)") { "3" } else { "7" };
        return json!({ "data": { "getMeetingById": { "id": 12, "hostId": host } } });
    }
    if query.contains("getMeetingById") {
        return json!({ "data": { "getMeetingById": {
            "id": "12",
            "name": "Weekly sync",
            "startTime": "2024-05-01T10:00:00Z",
            "meetingDuration": 60,
            "hostId": 7,
            "participants": [
                {
                    "id": 1, "userId": 3, "totalActiveSeconds": 3000,
                    "avgAttention": 80, "avgGaze": 90, "avgFace": 100,
                    "firstJoinTime": "2024-05-01T10:02:00Z",
                    "lastLeaveTime": "2024-05-01T11:00:00Z",
                    "user": { "id": 3, "name": "Ada Lovelace" }
                },
                {
                    "id": 2, "userId": 4, "totalActiveSeconds": 1200,
                    "avgAttention": 50,
                    "firstJoinTime": "2024-05-01T10:20:00Z",
                    "lastLeaveTime": "2024-05-01T10:40:00Z"
                }
            ]
        } } });
    }
    if query.contains("getUserbyId") {
        return json!({ "data": { "getUserbyId": {
            "id": "3", "name": "Ada", "email": "ada@example.com", "ImagePath": null
        } } });
    }
    json!({ "data": null })
}

fn rest_reply(name: &str) -> Value {
    match name {
        "JoinMeeting" => json!({ "token": "sdk-token" }),
        "resetPassword" => json!({ "token": "fresh-token" }),
        _ => json!({ "message": "ok" }),
    }
}

/// Starts the mock backend, returning its address and request log
async fn start_backend() -> (SocketAddr, Arc<Recorder>) {
    let recorder = Arc::new(Recorder::default());
    let with_recorder = {
        let recorder = recorder.clone();
        warp::any().map(move || recorder.clone())
    };

    let graphql = warp::post()
        .and(warp::path("graphql"))
        .and(warp::path::end())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_recorder.clone())
        .map(|auth: Option<String>, body: Value, recorder: Arc<Recorder>| {
            recorder.record("graphql", body.clone(), &auth);
            if !authorized(&auth) {
                return unauthorized();
            }
            let query = body["query"].as_str().unwrap_or_default();
            warp::reply::json(&graphql_reply(query)).into_response()
        });

    let rotate = warp::get()
        .and(warp::path!("api" / "changeOrganizationCode" / i64))
        .and(warp::header::optional::<String>("authorization"))
        .and(with_recorder.clone())
        .map(|id: i64, auth: Option<String>, recorder: Arc<Recorder>| {
            recorder.record("changeOrganizationCode", json!({ "id": id }), &auth);
            if !authorized(&auth) {
                return unauthorized();
            }
            warp::reply::json(&json!({ "organizationCode": format!("ORG-{}-NEW", id) })).into_response()
        });

    let rest = warp::post()
        .and(warp::path("api"))
        .and(warp::path::param::<String>())
        .and(warp::path::end())
        .and(warp::header::optional::<String>("authorization"))
        .and(warp::body::json())
        .and(with_recorder)
        .map(|name: String, auth: Option<String>, body: Value, recorder: Arc<Recorder>| {
            recorder.record(&name, body, &auth);
            let public = matches!(name.as_str(), "ForgetPassword" | "verifyResetCode" | "resetPassword");
            if !public && !authorized(&auth) {
                return unauthorized();
            }
            warp::reply::json(&rest_reply(&name)).into_response()
        });

    let (addr, server) = warp::serve(graphql.or(rotate).or(rest)).bind_ephemeral(([127, 0, 0, 1], 0));
    tokio::spawn(server);
    (addr, recorder)
}

fn config_for(addr: SocketAddr) -> Config {
    let mut config = Config::with_api_url(&format!("http://{}", addr));
    config.metrics.interval_secs = 1;
    config
}

fn signed_in(addr: SocketAddr) -> BackendClient {
    BackendClient::with_token(config_for(addr), Some(GOOD_TOKEN.to_string())).unwrap()
}

/// Waits until the backend has seen `n` requests on `path`
async fn wait_for(recorder: &Recorder, path: &str, n: usize) {
    timeout(Duration::from_secs(5), async {
        while recorder.count(path) < n {
            sleep(Duration::from_millis(50)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("backend never saw {} x{}", path, n));
}

#[tokio::test]
async fn test_current_user_and_meeting_report() {
    let (addr, recorder) = start_backend().await;
    let client = signed_in(addr);

    let user = client.current_user().await.unwrap();
    assert_eq!(user.id, 3);
    assert_eq!(user.email.as_deref(), Some("ada@example.com"));

    let meeting = client.meeting(12).await.unwrap();
    assert_eq!(meeting.participants.len(), 2);

    let report = MeetingReport::build(&meeting);
    assert_eq!(report.participant_count, 2);
    assert_eq!(report.duration, "1h 0m");
    assert_eq!(report.attendance.on_time, 1);
    assert_eq!(report.attendance.late, 1);
    assert_eq!(report.participants[1].name, "User 4");

    assert_eq!(recorder.count("graphql"), 2);
    assert!(recorder.all().iter().all(|s| s.authed));
}

#[tokio::test]
async fn test_graphql_errors_and_missing_records() {
    let (addr, _recorder) = start_backend().await;
    let client = signed_in(addr);

    match client.meeting(500).await {
        Err(MeetError::GraphQl(messages)) => assert_eq!(messages, vec!["boom".to_string()]),
        other => panic!("expected GraphQL error, got {:?}", other),
    }
    assert!(matches!(client.meeting(404).await, Err(MeetError::NotFound(_))));
}

#[tokio::test]
async fn test_rejected_token_is_auth_error() {
    let (addr, _recorder) = start_backend().await;
    let client = BackendClient::with_token(config_for(addr), Some("stale".to_string())).unwrap();

    let err = client.current_user().await.unwrap_err();
    assert!(matches!(err, MeetError::Unauthorized));
    assert!(err.is_auth());

    let ada = User {
        id: 3,
        name: "Ada".to_string(),
        email: None,
        image_path: None,
    };
    let err = client
        .join_meeting(12, &JoiningUser::new(&ada, Role::Participant))
        .await
        .unwrap_err();
    assert!(matches!(err, MeetError::Unauthorized));
}

#[tokio::test]
async fn test_resolver_looks_up_identity_then_joins() {
    let (addr, recorder) = start_backend().await;
    let resolver = SessionResolver::new(Arc::new(signed_in(addr)));

    let joined = resolver.resolve(12).await.unwrap();
    assert_eq!(joined.session.role, Role::Participant);
    assert_eq!(joined.session.user_id, 3);
    assert_eq!(joined.sdk_token, "sdk-token");
    assert_eq!(joined.session.chat_channel_id(), "messaging:12");

    assert_eq!(recorder.count("JoinMeeting"), 1);
    let body = &recorder.bodies("JoinMeeting")[0];
    assert_eq!(body["meetingId"], 12);
    assert_eq!(body["data"]["id"], 3);
    assert_eq!(body["data"]["name"], "Ada");
    assert_eq!(body["data"]["role"], "User");

    let joined = resolver.resolve(13).await.unwrap();
    assert_eq!(joined.session.role, Role::Host);
    assert_eq!(recorder.bodies("JoinMeeting")[1]["data"]["role"], "Host");

    // Identity lookups precede the join
    let seen = recorder.all();
    let first_join = seen.iter().position(|s| s.path == "JoinMeeting").unwrap();
    assert_eq!(seen[..first_join].iter().filter(|s| s.path == "graphql").count(), 2);
}

#[tokio::test]
async fn test_unresolved_meeting_posts_no_join() {
    let (addr, recorder) = start_backend().await;
    let resolver = SessionResolver::new(Arc::new(signed_in(addr)));

    assert!(matches!(resolver.resolve(404).await, Err(MeetError::NotFound(_))));
    assert_eq!(recorder.count("JoinMeeting"), 0);
}

#[tokio::test]
async fn test_room_samples_then_leaves_once() {
    let (addr, recorder) = start_backend().await;
    let config = config_for(addr);
    let backend = Arc::new(signed_in(addr));
    let joined = SessionResolver::new(backend.clone()).resolve(12).await.unwrap();

    let journal = CallJournal::default();
    let services = RoomServices {
        backend,
        video: Arc::new(HeadlessVideoClient::new(journal.clone())),
        chat: Arc::new(HeadlessChatClient::new(journal.clone())),
        source: Arc::new(SyntheticSource),
    };
    let (room, handle) = MeetingRoom::open(joined, services, &config).await.unwrap();
    assert!(room.sampling());

    let running = tokio::spawn(room.run());
    wait_for(&recorder, "metrics", 1).await;

    let sample = &recorder.bodies("metrics")[0];
    assert_eq!(sample["meetingId"], 12);
    assert_eq!(sample["userId"], 3);
    assert_eq!(sample["window"], 1);

    handle.leave();
    handle.leave();
    let exit = running.await.unwrap();
    assert_eq!(exit, Exit::Left);

    assert_eq!(recorder.count("leave"), 1);
    assert_eq!(recorder.count("end"), 0);
    assert_eq!(recorder.bodies("leave")[0], json!({ "meetingId": 12, "userId": 3 }));

    // Sampling stops with the room
    let posted = recorder.count("metrics");
    sleep(Duration::from_millis(1500)).await;
    assert_eq!(recorder.count("metrics"), posted);

    let journal = journal.lock().unwrap().clone();
    assert!(journal.contains(&"video.leave".to_string()));
    assert!(journal.contains(&"video.disconnect".to_string()));
    assert!(journal.contains(&"chat.disconnect".to_string()));
}

#[tokio::test]
async fn test_host_leave_ends_meeting() {
    let (addr, recorder) = start_backend().await;
    let config = config_for(addr);
    let backend = Arc::new(signed_in(addr));
    let joined = SessionResolver::new(backend.clone()).resolve(13).await.unwrap();

    let journal = CallJournal::default();
    let services = RoomServices {
        backend,
        video: Arc::new(HeadlessVideoClient::new(journal.clone())),
        chat: Arc::new(HeadlessChatClient::new(journal)),
        source: Arc::new(SyntheticSource),
    };
    let (room, handle) = MeetingRoom::open(joined, services, &config).await.unwrap();

    handle.set_camera(false);
    handle.leave();
    assert_eq!(room.run().await, Exit::Ended);

    assert_eq!(recorder.count("camera-off"), 1);
    assert_eq!(recorder.count("end"), 1);
    assert_eq!(recorder.bodies("end")[0], json!({ "meetingId": 13 }));
    assert_eq!(recorder.count("leave"), 0);
}

#[tokio::test]
async fn test_rotate_organization_code() {
    let (addr, recorder) = start_backend().await;
    let code = signed_in(addr).change_organization_code(4).await.unwrap();

    assert_eq!(code, "ORG-4-NEW");
    assert_eq!(recorder.count("changeOrganizationCode"), 1);
}

#[tokio::test]
async fn test_password_reset_signs_in() {
    let (addr, recorder) = start_backend().await;
    let backend = BackendClient::with_token(config_for(addr), None).unwrap();
    let store = Arc::new(MemoryTokenStore::default());

    let mut flow = PasswordReset::new(backend, store.clone(), " ada@example.com ").unwrap();
    flow.request_code().await.unwrap();
    assert_eq!(flow.step(), ResetStep::VerifyCode);

    flow.verify("123456").await.unwrap();
    flow.set_password("secret1", "secret1").await.unwrap();
    assert_eq!(flow.step(), ResetStep::Done);
    assert_eq!(store.load().as_deref(), Some("fresh-token"));

    assert_eq!(recorder.bodies("ForgetPassword")[0], json!({ "email": "ada@example.com" }));
    assert_eq!(recorder.bodies("resetPassword")[0]["confirmPassword"], "secret1");
    assert!(recorder.all().iter().all(|s| !s.authed));
}
