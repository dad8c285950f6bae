//! src/registry.rs
//!
//! @description
//! Idempotent bootstrap of the program's computation definitions. Safe to
//! run on every start and from several processes at once: a definition that
//! already exists, or that a concurrent bootstrap created first, is success.

use aces_table::circuit::CircuitKind;
use aces_table::pda;
use futures::future::join_all;
use tracing::{info, warn};

use crate::builders;
use crate::client::LedgerClient;
use crate::context::Context;
use crate::error::{Error, Result};

/// What `ensure_definition` found.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Bootstrap {
    Created,
    AlreadyPresent,
}

pub async fn ensure_definition<C: LedgerClient>(
    ctx: &Context<C>,
    circuit: CircuitKind,
) -> Result<Bootstrap> {
    let program_id = ctx.settings().program_id;
    let comp_def = pda::comp_def(&program_id, circuit).0;
    if ctx.account(&comp_def).await?.is_some() {
        return Ok(Bootstrap::AlreadyPresent);
    }

    let mxe = pda::mxe(&program_id).0;
    if ctx.account(&mxe).await?.is_none() {
        return Err(Error::PrerequisiteMissing {
            what: "MXE account",
            account: mxe,
        });
    }

    let ix = builders::init_comp_def(ctx.payer(), circuit)?;
    match ctx
        .submit(circuit.init_method(), vec![ix], vec![ctx.payer()])
        .await
    {
        Ok(slot) => {
            ctx.wait_for_account(&comp_def).await?;
            info!(%circuit, offset = circuit.comp_def_offset(), slot, "computation definition created");
            Ok(Bootstrap::Created)
        }
        Err(err) => {
            // Another bootstrap may have created it between our read and our write.
            if ctx.wait_for_account(&comp_def).await.is_ok() {
                warn!(%circuit, error = %err, "computation definition created concurrently");
                return Ok(Bootstrap::AlreadyPresent);
            }
            if err.account_in_use() == Some(comp_def) {
                return Err(Error::AlreadyInitialized { circuit });
            }
            Err(err)
        }
    }
}

/// Bootstraps every circuit concurrently; their accounts are disjoint.
pub async fn ensure_all<C: LedgerClient>(ctx: &Context<C>) -> Result<Vec<(CircuitKind, Bootstrap)>> {
    let results = join_all(
        CircuitKind::ALL
            .into_iter()
            .map(|circuit| async move { (circuit, ensure_definition(ctx, circuit).await) }),
    )
    .await;
    results
        .into_iter()
        .map(|(circuit, result)| result.map(|outcome| (circuit, outcome)))
        .collect()
}
