use fsroute::{CookieOptions, RouteModule};
use serde_json::json;

pub fn module() -> RouteModule {
    RouteModule::new()
        .get(|req, res| {
            Box::pin(async move {
                let visits = req.cookie("visits").and_then(|v| v.as_i64()).unwrap_or(0) + 1;
                res.cookie(
                    "visits",
                    visits,
                    CookieOptions::new().signed(true).http_only(true).max_age_ms(86_400_000),
                )?;
                Ok(res.json(&json!({ "visits": visits }))?)
            })
        })
        .delete(|_req, res| {
            Box::pin(async move {
                res.clear_cookie("visits", CookieOptions::new())?;
                Ok(res.send("session cleared"))
            })
        })
}
