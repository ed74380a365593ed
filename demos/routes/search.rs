use fsroute::{RouteConfig, RouteModule, RouteSchema};
use serde_json::json;

pub fn module() -> RouteModule {
    RouteModule::new()
        .get(|req, res| Box::pin(async move { Ok(res.json(&req.query)?) }))
        .config(RouteConfig::new().schema(RouteSchema::new().query(json!({
            "type": "object",
            "properties": {
                "q": { "type": "string", "minLength": 1 },
                "limit": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 },
                "tags": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["q"]
        }))))
}
