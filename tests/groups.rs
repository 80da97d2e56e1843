use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use hyper::StatusCode;
use scoperoute::{from_fn, Error, Flow, HandlerResult, Outcome, Request, Response, Router, SharedMiddleware};

type Log = Arc<Mutex<Vec<&'static str>>>;

fn recorder(log: &Log, name: &'static str) -> SharedMiddleware {
    let log = log.clone();
    from_fn(move |req, _| {
        log.lock().unwrap().push(name);
        Ok(Flow::Next(req))
    })
}

fn ok(_: Request, res: &mut Response) -> HandlerResult {
    res.send("ok", StatusCode::OK);
    Ok(())
}

fn paths(router: &Router) -> Vec<&str> {
    router.routes().iter().map(|route| route.path()).collect()
}

#[test]
fn nested_groups_compose_prefixes() {
    let mut router = Router::new();
    router
        .group("/v1", [], |v1| {
            v1.group("/api", [], |api| {
                api.get("/users", ok, [])?;
                Ok(())
            })?;
            v1.get("/status", ok, [])?;
            Ok(())
        })
        .unwrap();
    router.get("/users", ok, []).unwrap();

    assert_eq!(paths(&router), ["/v1/api/users", "/v1/status", "/users"]);
    assert_eq!(router.dispatch("GET", "/v1/api/users").unwrap().outcome, Outcome::Handled);
    assert_eq!(router.dispatch("GET", "/api/users").unwrap().outcome, Outcome::NotFound);
}

#[test]
fn group_root_route_uses_the_prefix() {
    let mut router = Router::new();
    router
        .group("admin/", [], |admin| {
            admin.get("/", ok, [])?;
            Ok(())
        })
        .unwrap();

    assert_eq!(paths(&router), ["/admin"]);
    assert_eq!(router.dispatch("GET", "/admin/").unwrap().outcome, Outcome::Handled);
}

#[test]
fn middleware_runs_global_then_group_then_route() {
    let log = Log::default();

    let mut router = Router::new();
    router
        .middleware([recorder(&log, "global")], |r| {
            r.group("/v1", [recorder(&log, "v1")], |v1| {
                v1.group("/api", [recorder(&log, "api")], |api| {
                    api.get("/users", ok, [recorder(&log, "route")])?;
                    Ok(())
                })?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    let dispatched = router.dispatch("GET", "/v1/api/users").unwrap();
    assert_eq!(dispatched.outcome, Outcome::Handled);
    assert_eq!(*log.lock().unwrap(), ["global", "v1", "api", "route"]);
}

#[test]
fn global_middleware_inside_a_group_runs_first() {
    let log = Log::default();

    let mut router = Router::new();
    router
        .group("/admin", [recorder(&log, "group")], |admin| {
            admin.middleware([recorder(&log, "global")], |r| {
                r.get("/panel", ok, [])?;
                Ok(())
            })?;
            Ok(())
        })
        .unwrap();

    assert_eq!(paths(&router), ["/admin/panel"]);
    let _ = router.dispatch("GET", "/admin/panel").unwrap();
    assert_eq!(*log.lock().unwrap(), ["global", "group"]);
}

#[test]
fn scope_ends_with_the_group() {
    let log = Log::default();

    let mut router = Router::new();
    router
        .group("/inner", [recorder(&log, "inner")], |inner| {
            inner.get("/a", ok, [])?;
            Ok(())
        })
        .unwrap();
    router.get("/b", ok, []).unwrap();

    assert_eq!(paths(&router), ["/inner/a", "/b"]);
    assert_eq!(router.routes()[1].middleware().len(), 0);

    let _ = router.dispatch("GET", "/b").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn scope_is_restored_after_a_failing_body() {
    let mut router = Router::new();
    let err = router
        .group("/broken", [from_fn(|req, _| Ok(Flow::Next(req)))], |broken| {
            broken.get("/ok", ok, [])?;
            broken.get("/{x}/{x}", ok, [])?;
            broken.get("/never", ok, [])?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateParam { .. }));

    router.get("/after", ok, []).unwrap();

    assert_eq!(paths(&router), ["/broken/ok", "/after"]);
    assert!(router.routes()[1].middleware().is_empty());
}

#[test]
fn scope_is_restored_after_a_panicking_body() {
    let mut router = Router::new();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = router.group("/panicky", [], |_| panic!("body blew up"));
    }));
    assert!(result.is_err());

    router.get("/after", ok, []).unwrap();
    assert_eq!(paths(&router), ["/after"]);
}

#[test]
fn middleware_block_is_restored_after_a_failing_body() {
    let log = Log::default();

    let mut router = Router::new();
    let err = router
        .middleware([recorder(&log, "scoped")], |r| {
            r.get("/inside", ok, [])?;
            r.get("/{x}/{x}", ok, [])?;
            Ok(())
        })
        .unwrap_err();
    assert!(matches!(err, Error::DuplicateParam { .. }));

    router.get("/after", ok, []).unwrap();

    assert_eq!(paths(&router), ["/inside", "/after"]);
    assert_eq!(router.routes()[0].middleware().len(), 1);
    assert!(router.routes()[1].middleware().is_empty());

    let _ = router.dispatch("GET", "/after").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn middleware_block_is_restored_after_a_panicking_body() {
    let log = Log::default();
    let mut router = Router::new();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let _ = router.middleware([recorder(&log, "scoped")], |r| {
            r.get("/inside", ok, []).unwrap();
            panic!("body blew up")
        });
    }));
    assert!(result.is_err());

    router.get("/after", ok, []).unwrap();

    assert_eq!(paths(&router), ["/inside", "/after"]);
    assert!(router.routes()[1].middleware().is_empty());

    let _ = router.dispatch("GET", "/after").unwrap();
    assert!(log.lock().unwrap().is_empty());
}

#[test]
fn shared_middleware_halts_a_whole_group() {
    let mut router = Router::new();
    let auth = from_fn(|req, res| {
        if req.has_header("authorization") {
            return Ok(Flow::Next(req));
        }
        res.send("Unauthorized", StatusCode::UNAUTHORIZED);
        Ok(Flow::Halt)
    });

    router
        .group("/admin", [auth], |admin| {
            admin.get("/users", ok, [])?;
            admin.post("/users", ok, [])?;
            Ok(())
        })
        .unwrap();
    router.get("/public", ok, []).unwrap();

    for (method, target) in [("GET", "/admin/users"), ("POST", "/admin/users")] {
        let dispatched = router.dispatch(method, target).unwrap();
        assert_eq!(dispatched.outcome, Outcome::Halted);
        assert_eq!(dispatched.response.status(), StatusCode::UNAUTHORIZED);
    }
    assert_eq!(router.dispatch("GET", "/public").unwrap().response.text(), "ok");
}

#[test]
fn group_params_reach_the_handler() {
    let mut router = Router::new();
    router
        .group("/teams/{team}", [], |team| {
            team.get("/members/{member:\\d+}", |req: Request, res: &mut Response| -> HandlerResult {
                res.send(
                    format!(
                        "{}:{}",
                        req.attribute("team").unwrap_or_default(),
                        req.attribute("member").unwrap_or_default()
                    ),
                    StatusCode::OK,
                );
                Ok(())
            }, [])?;
            Ok(())
        })
        .unwrap();

    let dispatched = router.dispatch("GET", "/teams/core/members/12").unwrap();
    assert_eq!(dispatched.response.text(), "core:12");
}
