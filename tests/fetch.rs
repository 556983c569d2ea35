use std::net::TcpListener;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use recruit_board::board::{self, SortOrder};
use recruit_board::data::{BoardService, SheetBoardService};
use recruit_board::sheet::{Client, ClientConfig, FetchError};
use tiny_http::{Header, Response, Server};

/// Serves exactly one request with the given status and body.
fn serve_once(status: u16, body: &'static str) -> String {
    let server = Server::http("127.0.0.1:0").expect("bind test server");
    let addr = server
        .server_addr()
        .to_ip()
        .expect("test server has an ip address");
    thread::spawn(move || {
        if let Ok(request) = server.recv() {
            let header = Header::from_bytes(&b"Content-Type"[..], &b"text/csv; charset=utf-8"[..])
                .expect("valid header");
            let response = Response::from_string(body)
                .with_status_code(status)
                .with_header(header);
            let _ = request.respond(response);
        }
    });
    format!("http://{addr}/pub?output=csv")
}

fn service_for(url: String) -> SheetBoardService {
    let client = Client::new(ClientConfig {
        url,
        timeout: Duration::from_secs(5),
        ..ClientConfig::default()
    })
    .expect("build client");
    SheetBoardService::new(Arc::new(client))
}

#[test]
fn fetches_and_materializes_sheet() {
    let url = serve_once(
        200,
        "タイムスタンプ,研究名,詳細\r\n2024/01/01,Study A,\"謝礼: 1,000円\r\n所要時間: 30分\"\r\n2024/01/02,,\r\n2024/01/03,Study B,Unpaid\r\n",
    );
    let posts = service_for(url).load_posts().expect("load posts");
    assert_eq!(posts.len(), 2);
    assert_eq!(posts[0].details, "謝礼: 1,000円\r\n所要時間: 30分");

    let view = board::sorted_view(&posts, SortOrder::Newest);
    assert_eq!(view[0].post.title, "Study B");
    assert_eq!(view[0].display_number, 2);
    assert_eq!(view[1].post.title, "Study A");
    assert_eq!(view[1].display_number, 1);
}

#[test]
fn non_success_status_is_a_fetch_error() {
    let url = serve_once(500, "oops");
    let err = service_for(url).load_posts().expect_err("status 500 must fail");
    match err.downcast_ref::<FetchError>() {
        Some(FetchError::Status(status)) => assert_eq!(status.as_u16(), 500),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[test]
fn unreachable_host_is_a_network_error() {
    // Bind then drop so the port is closed when the client connects.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind listener");
        listener.local_addr().expect("local addr")
    };
    let err = service_for(format!("http://{addr}/export.csv"))
        .load_posts()
        .expect_err("closed port must fail");
    assert!(matches!(
        err.downcast_ref::<FetchError>(),
        Some(FetchError::Network(_))
    ));
}
