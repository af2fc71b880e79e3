//! Panel selection and text rendering for the terminal front end

use std::fmt;
use std::sync::Arc;

use crate::format::{
    format_amount, format_countdown, format_interval, format_next_draw, format_winner,
};
use crate::sync::ViewState;
use crate::types::{Address, ChainId, RaffleSnapshot, WalletContext};

/// Exactly one of these is on screen at a time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Panel {
    ConnectWallet,
    SwitchNetwork {
        chain_id: ChainId,
        supported: Vec<ChainId>,
    },
    Raffle(RafflePanel),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RafflePanel {
    pub contract: Address,
    pub chain_id: ChainId,
    pub snapshot: Option<Arc<RaffleSnapshot>>,
    pub loading: bool,
    pub read_error: Option<String>,
    /// Enter action is disabled while set.
    pub entering: bool,
}

impl RafflePanel {
    pub fn can_enter(&self) -> bool {
        !self.entering && self.snapshot.is_some()
    }
}

pub fn select_panel(state: &ViewState, supported: &[ChainId], entering: bool) -> Panel {
    match state {
        ViewState::Disconnected => Panel::ConnectWallet,
        ViewState::NetworkUnsupported { chain_id } => Panel::SwitchNetwork {
            chain_id: *chain_id,
            supported: supported.to_vec(),
        },
        ViewState::Ready(view) => Panel::Raffle(RafflePanel {
            contract: view.contract.address,
            chain_id: view.contract.chain_id,
            snapshot: view.snapshot.clone(),
            loading: view.loading,
            read_error: view.read_error.clone(),
            entering,
        }),
    }
}

pub fn header(ctx: &WalletContext) -> String {
    match (ctx.connected, ctx.account, ctx.chain_id) {
        (true, Some(account), Some(chain_id)) => {
            format!("Connected with {} on {}", account, chain_id)
        }
        _ => "Not connected".to_string(),
    }
}

impl Panel {
    /// `now` is unix seconds, used for the countdown only.
    pub fn render(&self, now: u64) -> String {
        match self {
            Panel::ConnectWallet => "Please connect your Wallet to continue.".to_string(),
            Panel::SwitchNetwork { chain_id, supported } => {
                let supported = supported
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                format!(
                    "Chain {} is not supported. Please switch to one of [{}] to continue.",
                    chain_id, supported
                )
            }
            Panel::Raffle(panel) => RaffleLines { panel, now }.to_string(),
        }
    }
}

struct RaffleLines<'a> {
    panel: &'a RafflePanel,
    now: u64,
}

impl fmt::Display for RaffleLines<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let panel = self.panel;
        writeln!(f, "Raffle {} on chain {}", panel.contract, panel.chain_id)?;

        match &panel.snapshot {
            Some(s) => {
                writeln!(f, "Current number of players: {}", s.player_count)?;
                writeln!(f, "Raffle entry fee: {}", format_amount(s.entry_fee))?;
                writeln!(f, "Current Prize Pool: {}", format_amount(s.contract_balance))?;
                writeln!(f, "Most recent winner: {}", format_winner(s.recent_winner))?;
                writeln!(f, "Draw interval: {}", format_interval(s.interval))?;
                writeln!(
                    f,
                    "Next draw: {} (in {})",
                    format_next_draw(s),
                    format_countdown(s, self.now)
                )?;
            }
            None => writeln!(f, "Loading raffle state...")?,
        }

        if panel.loading && panel.snapshot.is_some() {
            writeln!(f, "(refreshing...)")?;
        }
        if let Some(err) = &panel.read_error {
            writeln!(f, "Read error: {}", err)?;
        }

        let action = if panel.entering {
            "[ Enter Raffle (pending...) ]"
        } else if panel.can_enter() {
            "[ Enter Raffle ]"
        } else {
            "[ Enter Raffle (unavailable) ]"
        };
        f.write_str(action)
    }
}
