//! Running a context over real UDP sockets on the loopback interface.
#![cfg(feature = "tokio")]

use dnsctx::base::{Name, Rcode, Record, RecordData, Request, Rtype};
use dnsctx::net::driver::{run, TokioTransport};
use dnsctx::resolv::{Callbacks, Context, Failure};
use std::cell::RefCell;
use std::net::{Ipv4Addr, SocketAddr};
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::UdpSocket;

/// Starts a server answering every A query with a fixed address.
///
/// Queries for names below `nxdomain.test` get a negative answer.
async fn spawn_server() -> SocketAddr {
    let sock = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let addr = sock.local_addr().unwrap();
    tokio::spawn(async move {
        let mut buf = vec![0; 65535];
        let nxdomain = Name::from_str("nxdomain.test.").unwrap();
        loop {
            let (len, peer) = match sock.recv_from(&mut buf).await {
                Ok(res) => res,
                Err(_) => return,
            };
            let request = match Request::parse(&buf[..len]) {
                Ok(request) => request,
                Err(_) => continue,
            };
            let qname = request.question().qname().clone();
            let reply = if qname.ends_with(&nxdomain) {
                request.reply(Rcode::NXDOMAIN, &[])
            } else {
                let record = Record::new(
                    qname,
                    300,
                    RecordData::A(Ipv4Addr::new(192, 0, 2, 53)),
                );
                request.reply(Rcode::NOERROR, &[record])
            };
            let _ = sock.send_to(&reply, peer).await;
        }
    });
    addr
}

#[tokio::test]
async fn resolve_over_loopback() {
    let server = spawn_server().await;
    let mut ctx = Context::new(TokioTransport::new());
    ctx.nameserver_addr(server);

    let results = Rc::new(RefCell::new(Vec::new()));
    for qname in ["www.example.com", "host.nxdomain.test"] {
        let ok = results.clone();
        let err = results.clone();
        ctx.query(
            qname,
            Rtype::A,
            Callbacks::new(
                move |_, _, response| {
                    ok.borrow_mut()
                        .push(Ok(response.addresses().collect::<Vec<_>>()))
                },
                move |_, _, failure: Failure| {
                    err.borrow_mut().push(Err(failure.rcode()))
                },
            ),
        )
        .unwrap();
    }
    tokio::time::timeout(Duration::from_secs(10), run(&mut ctx))
        .await
        .unwrap();

    let mut results = results.take();
    results.sort_by_key(|item| item.is_err());
    assert_eq!(
        results,
        [
            Ok(vec![Ipv4Addr::new(192, 0, 2, 53).into()]),
            Err(Some(Rcode::NXDOMAIN)),
        ]
    );
    assert!(ctx.is_idle());
}

#[tokio::test]
async fn times_out_without_server() {
    // Nothing listens on this socket, it only reserves the port.
    let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let mut ctx = Context::new(TokioTransport::new());
    ctx.nameserver_addr(silent.local_addr().unwrap());
    ctx.set_attempts(1);
    ctx.set_timeout(Duration::from_millis(200));

    let failed = Rc::new(RefCell::new(None));
    let res = failed.clone();
    ctx.query(
        "example.com",
        Rtype::A,
        Callbacks::new(
            |_, _, _| panic!("unexpected response"),
            move |_, _, failure: Failure| *res.borrow_mut() = Some(failure),
        ),
    )
    .unwrap();
    tokio::time::timeout(Duration::from_secs(10), run(&mut ctx))
        .await
        .unwrap();
    assert!(failed.take().unwrap().is_timeout());
}

#[cfg(feature = "serde")]
#[test]
fn settings_roundtrip_json() {
    use dnsctx::resolv::Settings;

    let mut settings = Settings::new();
    settings.set_attempts(4);
    settings.set_rotate(true);
    let json = serde_json::to_string(&settings).unwrap();
    let back: Settings = serde_json::from_str(&json).unwrap();
    assert_eq!(back.attempts(), 4);
    assert!(back.rotate());
}
