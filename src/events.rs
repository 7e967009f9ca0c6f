//! Events emitted by committed operations
//!
//! Token movement belongs to the caller. Events carry the recipients and
//! amounts it needs to settle each operation.

use serde::{Deserialize, Serialize};
use twamm_math::U256;

use crate::types::{Address, OrderId, Token};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PoolEvent {
    Mint {
        to: Address,
        amount0: U256,
        amount1: U256,
        liquidity: U256,
    },
    Burn {
        to: Address,
        amount0: U256,
        amount1: U256,
        liquidity: U256,
    },
    Swap {
        to: Address,
        token_in: Token,
        amount_in: U256,
        amount_out: U256,
    },
    LongTermOrderSubmitted {
        order_id: OrderId,
        owner: Address,
        sell_token: Token,
        deposit: U256,
        sell_rate: U256,
        expiration: u64,
        dust_refund: U256,
    },
    LongTermOrderCancelled {
        order_id: OrderId,
        owner: Address,
        refund_principal: U256,
        refund_proceeds: U256,
    },
    ProceedsWithdrawn {
        order_id: OrderId,
        owner: Address,
        buy_token: Token,
        proceeds: U256,
        expired: bool,
    },
    VirtualOrdersExecuted {
        from: u64,
        to: u64,
        steps: u32,
        token0_sold: U256,
        token1_sold: U256,
    },
    ProtocolFeeMinted {
        fee_to: Address,
        liquidity: U256,
    },
}
