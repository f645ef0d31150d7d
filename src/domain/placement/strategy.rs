use std::str::FromStr;

use crate::domain::optimizer::worker::OptimizerClient;
use crate::error::Error;

/// Name of a congestion resolution strategy as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyKind {
    Greedy,
    Optimizer,
}

impl FromStr for StrategyKind {
    type Err = Error;

    fn from_str(strategy: &str) -> Result<StrategyKind, Self::Err> {
        match strategy {
            "greedy" | "QoSGreedy" => Ok(StrategyKind::Greedy),
            "optimizer" | "ILPSolution" => Ok(StrategyKind::Optimizer),
            _ => Err(Error::ConfigError(format!("unknown resolution strategy '{}'", strategy))),
        }
    }
}

/// How the controller reacts to a congested link.
#[derive(Debug, Clone)]
pub enum ResolutionStrategy {
    /// Walk each affected group's route and re-home it at the first node
    /// where the co-located demand fits.
    Greedy,
    /// Hand the whole roster to an external solver and apply its answer
    /// when it arrives.
    Optimizer(OptimizerClient),
}

impl ResolutionStrategy {
    pub fn kind(&self) -> StrategyKind {
        match self {
            ResolutionStrategy::Greedy => StrategyKind::Greedy,
            ResolutionStrategy::Optimizer(_) => StrategyKind::Optimizer,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strategy_names() {
        assert_eq!("greedy".parse::<StrategyKind>().unwrap(), StrategyKind::Greedy);
        assert_eq!("ILPSolution".parse::<StrategyKind>().unwrap(), StrategyKind::Optimizer);
        assert!("simulatedAnnealing".parse::<StrategyKind>().is_err());
    }
}
