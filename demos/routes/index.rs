use fsroute::RouteModule;
use serde_json::json;

pub fn module() -> RouteModule {
    RouteModule::new().get(|req, res| {
        Box::pin(async move {
            Ok(res.json(&json!({
                "message": "fsroute is running",
                "request_id": req.request_id.as_str(),
            }))?)
        })
    })
}
