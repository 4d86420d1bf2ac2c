pub mod apply;
pub mod delete;
pub mod import;
pub mod parse_id;
pub mod plan;
pub mod read;
pub mod validate;

/// Build the reconciler for `$kind` and evaluate `$body` with it bound to `$r`
macro_rules! with_reconciler {
    ($ctx:expr, $kind:expr, |$r:ident| $body:expr) => {
        match $kind {
            $crate::resource::ResourceKind::CosmosDbMongoApi => {
                let $r = reconflow_cloud_azure::datafactory::cosmosdb_mongoapi_reconciler(
                    $ctx.client()?,
                    $ctx.subscription_id()?,
                )
                .with_timeouts($ctx.timeouts());
                $body
            }
            $crate::resource::ResourceKind::IotHubStorageContainer => {
                let $r = reconflow_cloud_azure::iothub::storage_container_reconciler(
                    $ctx.client()?,
                    $ctx.subscription_id()?,
                )
                .with_timeouts($ctx.timeouts());
                $body
            }
        }
    };
}

pub(crate) use with_reconciler;
