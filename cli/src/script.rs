//! Scripted scenario replay.
//!
//! A script is a TOML file with a start time and a list of `[[step]]` tables,
//! each naming an `action`. Steps run in order against a [`Dao`] driven by a
//! [`NullClock`]; only `advance` moves time.

use std::collections::HashMap;

use anyhow::{anyhow, bail, Context};
use hopestream_dao::{Dao, DaoError};
use hopestream_governance::ProposalAction;
use hopestream_nullables::NullClock;
use hopestream_types::{Address, Amount, AntiSybilParams, Clock, ProposalId, VoteSupport};
use hopestream_utils::SystemClock;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct Script {
    /// Unix seconds the replay clock starts at; the wall clock when absent.
    #[serde(default)]
    pub start: Option<u64>,
    #[serde(default, rename = "step")]
    pub steps: Vec<Step>,
}

impl Script {
    pub fn from_toml_str(s: &str) -> anyhow::Result<Self> {
        toml::from_str(s).context("parsing scenario script")
    }

    pub fn start_secs(&self) -> u64 {
        self.start.unwrap_or_else(|| SystemClock.now().as_secs())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Support {
    Against,
    For,
    Abstain,
}

impl From<Support> for VoteSupport {
    fn from(s: Support) -> Self {
        match s {
            Support::Against => VoteSupport::Against,
            Support::For => VoteSupport::For,
            Support::Abstain => VoteSupport::Abstain,
        }
    }
}

/// How a step names a proposal: by a label given earlier in the same script,
/// or by its id, which also reaches proposals made before a `--load-state`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct ProposalRef {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub id: Option<ProposalId>,
}

impl ProposalRef {
    pub fn label(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            id: None,
        }
    }

    pub fn id(id: ProposalId) -> Self {
        Self {
            label: None,
            id: Some(id),
        }
    }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    Donate { from: Address, amount: Amount },
    Advance { secs: u64 },
    Delegate { from: Address, to: Address },
    Propose {
        /// Name later steps use to refer to this proposal.
        label: String,
        proposer: Address,
        description: String,
        proposal: ProposalAction,
    },
    Vote {
        voter: Address,
        #[serde(flatten)]
        target: ProposalRef,
        support: Support,
    },
    Queue {
        #[serde(flatten)]
        target: ProposalRef,
    },
    Execute {
        #[serde(flatten)]
        target: ProposalRef,
    },
    Cancel {
        #[serde(flatten)]
        target: ProposalRef,
        caller: Address,
    },
    AddMilestone {
        caller: Address,
        amount: Amount,
        /// Seconds from now; the vault's default maturation when absent.
        #[serde(default)]
        release_in: Option<u64>,
    },
    Release { caller: Address },
    Pause { caller: Address },
    Unpause { caller: Address },
    SetBeneficiary { caller: Address, to: Address },
    SetRelayer { caller: Address, to: Address },
    UpdateAntiSybil { caller: Address, params: AntiSybilParams },
    FundTimelock { from: Address, amount: Amount },
}

impl Step {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Donate { .. } => "donate",
            Self::Advance { .. } => "advance",
            Self::Delegate { .. } => "delegate",
            Self::Propose { .. } => "propose",
            Self::Vote { .. } => "vote",
            Self::Queue { .. } => "queue",
            Self::Execute { .. } => "execute",
            Self::Cancel { .. } => "cancel",
            Self::AddMilestone { .. } => "add_milestone",
            Self::Release { .. } => "release",
            Self::Pause { .. } => "pause",
            Self::Unpause { .. } => "unpause",
            Self::SetBeneficiary { .. } => "set_beneficiary",
            Self::SetRelayer { .. } => "set_relayer",
            Self::UpdateAntiSybil { .. } => "update_anti_sybil",
            Self::FundTimelock { .. } => "fund_timelock",
        }
    }
}

/// A step the DAO rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StepFailure {
    pub step: usize,
    pub action: &'static str,
    pub code: &'static str,
    pub message: String,
}

/// Replays steps and remembers proposal labels.
pub struct Runner<'c> {
    pub dao: Dao<&'c NullClock>,
    clock: &'c NullClock,
    labels: HashMap<String, ProposalId>,
}

impl<'c> Runner<'c> {
    pub fn new(dao: Dao<&'c NullClock>, clock: &'c NullClock) -> Self {
        Self {
            dao,
            clock,
            labels: HashMap::new(),
        }
    }

    fn proposal(&self, target: &ProposalRef) -> anyhow::Result<ProposalId> {
        match (&target.label, target.id) {
            (Some(label), None) => self
                .labels
                .get(label)
                .copied()
                .ok_or_else(|| anyhow!("unknown proposal label {label:?}")),
            (None, Some(id)) => Ok(id),
            (Some(label), Some(id)) => match self.labels.get(label) {
                Some(known) if *known == id => Ok(id),
                Some(known) => bail!("label {label:?} is proposal {known}, not {id}"),
                None => bail!("unknown proposal label {label:?}"),
            },
            (None, None) => bail!("step names no proposal; give `label` or `id`"),
        }
    }

    /// Apply one step.
    ///
    /// `Ok(Err(..))` is a rejection by the DAO and the replay may continue;
    /// `Err(..)` means the script itself is broken.
    pub fn apply(&mut self, index: usize, step: &Step) -> anyhow::Result<Result<(), StepFailure>> {
        let result: Result<(), DaoError> = match step {
            Step::Donate { from, amount } => self.dao.donate(*from, *amount).map(|_| ()),
            Step::Advance { secs } => {
                self.clock.advance(*secs);
                Ok(())
            }
            Step::Delegate { from, to } => self.dao.delegate(*from, *to),
            Step::Propose {
                label,
                proposer,
                description,
                proposal,
            } => {
                if self.labels.contains_key(label) {
                    return Err(anyhow!("proposal label {label:?} used twice"));
                }
                self.dao
                    .propose(*proposer, proposal.clone(), description)
                    .map(|id| {
                        self.labels.insert(label.clone(), id);
                    })
            }
            Step::Vote {
                voter,
                target,
                support,
            } => {
                let id = self.proposal(target)?;
                self.dao.cast_vote(*voter, id, (*support).into()).map(|_| ())
            }
            Step::Queue { target } => {
                let id = self.proposal(target)?;
                self.dao.queue(id).map(|_| ())
            }
            Step::Execute { target } => {
                let id = self.proposal(target)?;
                self.dao.execute(id)
            }
            Step::Cancel { target, caller } => {
                let id = self.proposal(target)?;
                self.dao.cancel(id, *caller)
            }
            Step::AddMilestone {
                caller,
                amount,
                release_in,
            } => {
                let release_time = release_in.map(|secs| self.dao.now().plus(secs));
                self.dao.add_milestone(*caller, *amount, release_time).map(|_| ())
            }
            Step::Release { caller } => self.dao.release_funds(*caller).map(|_| ()),
            Step::Pause { caller } => self.dao.pause(*caller),
            Step::Unpause { caller } => self.dao.unpause(*caller),
            Step::SetBeneficiary { caller, to } => self.dao.set_beneficiary(*caller, *to),
            Step::SetRelayer { caller, to } => self.dao.set_relayer(*caller, *to),
            Step::UpdateAntiSybil { caller, params } => {
                self.dao.update_anti_sybil_parameters(*caller, *params)
            }
            Step::FundTimelock { from, amount } => self.dao.fund_timelock(*from, *amount),
        };
        Ok(result.map_err(|e| {
            tracing::warn!(step = index, action = step.name(), error = %e, "step rejected");
            StepFailure {
                step: index,
                action: step.name(),
                code: e.code(),
                message: e.to_string(),
            }
        }))
    }
}
