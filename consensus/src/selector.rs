//! Engine selection at node construction.

use std::path::Path;
use std::sync::Arc;

use huc_store::Database;
use huc_types::ChainConfig;

use crate::clique::Clique;
use crate::ethash::{Ethash, EthashConfig, PowMode};
use crate::{ConsensusEngine, ConsensusError};

/// Pick the consensus engine for a chain.
///
/// A proof-of-authority chain always gets [`Clique`]; otherwise the
/// proof-of-work mode decides. The default engine never seals locally.
/// Relative cache directories are resolved against `data_dir`.
pub fn create_consensus_engine(
    data_dir: Option<&Path>,
    config: &EthashConfig,
    chain_config: &ChainConfig,
    db: Arc<dyn Database>,
) -> Result<ConsensusEngine, ConsensusError> {
    if let Some(clique) = &chain_config.clique {
        return Ok(ConsensusEngine::Clique(Arc::new(Clique::new(clique.clone(), db)?)));
    }

    let engine = match config.pow_mode {
        PowMode::Fake => {
            tracing::warn!("Ethash used in fake mode");
            Arc::new(Ethash::new_faker())
        }
        PowMode::Test => {
            tracing::warn!("Ethash used in test mode");
            Arc::new(Ethash::new_tester())
        }
        PowMode::Shared => {
            tracing::warn!("Ethash used in shared mode");
            Ethash::new_shared()
        }
        PowMode::Normal => {
            let cache_dir = match data_dir {
                Some(dir) if config.cache_dir.is_relative() => dir.join(&config.cache_dir),
                _ => config.cache_dir.clone(),
            };
            tracing::info!(
                cache_dir = %cache_dir.display(),
                dataset_dir = %config.dataset_dir.display(),
                caches_in_mem = config.caches_in_mem,
                datasets_in_mem = config.datasets_in_mem,
                "Ethash engine configured"
            );
            let engine = Ethash::new(EthashConfig {
                cache_dir,
                ..config.clone()
            });
            engine.set_threads(-1);
            Arc::new(engine)
        }
    };
    Ok(ConsensusEngine::Ethash(engine))
}
