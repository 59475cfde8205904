//! Macro for registering async handlers.

/// Turn an `async fn(Arc<ToolContext>, ParsedArgs) -> ToolkitResult<Value>`
/// into a [`Handler`](crate::tools::registry::Handler) function pointer.
///
/// # Example
///
/// ```ignore
/// ToolSpec::read("get_stats", "Dashboard stats", handler!(get_stats))
/// ```
macro_rules! handler {
    ($f:path) => {{
        fn boxed(
            ctx: ::std::sync::Arc<$crate::tools::context::ToolContext>,
            args: $crate::tools::args::ParsedArgs,
        ) -> ::futures_util::future::BoxFuture<
            'static,
            $crate::error::ToolkitResult<::serde_json::Value>,
        > {
            Box::pin($f(ctx, args))
        }
        boxed as $crate::tools::registry::Handler
    }};
}

pub(crate) use handler;

#[cfg(test)]
mod tests {
    use crate::error::ToolkitResult;
    use crate::tools::args::ParsedArgs;
    use crate::tools::context::{Endpoints, ToolContext};
    use crate::tools::gate::MutationGate;
    use serde_json::{Value, json};
    use std::sync::Arc;

    async fn echo_tool(_ctx: Arc<ToolContext>, args: ParsedArgs) -> ToolkitResult<Value> {
        Ok(json!({ "tool": args.tool() }))
    }

    #[tokio::test]
    async fn test_handler_macro_boxes_async_fn() {
        let handler = handler!(echo_tool);
        let db = Arc::new(crate::db::PgDatabase::new(
            None,
            1,
            std::time::Duration::from_secs(1),
        ));
        let ctx = Arc::new(ToolContext::new(
            db,
            MutationGate::default(),
            &Endpoints::default(),
            reqwest::Client::new(),
        ));
        let value = handler(ctx, ParsedArgs::new("echo_tool", Default::default()))
            .await
            .unwrap();
        assert_eq!(value["tool"], "echo_tool");
    }
}
