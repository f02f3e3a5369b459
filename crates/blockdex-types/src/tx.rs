//! Signed transactions and the canonical bytes their signatures cover.
//!
//! ```text
//! SignedTransaction
//!   ├── msgs        one or more Msg, each naming its signer
//!   ├── fee         StdFee { amount, mode, gas }
//!   ├── signatures  one StdSignature per distinct signer, in signer order
//!   └── memo
//!
//! sign bytes = JSON { account_number, chain_id, fee, memo, msgs, sequence }
//! ```

use ed25519_dalek::{Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::{Address, Coins, FeeMode, PubKey, Result, Side, TimeInForce, TxHash};

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Place a limit order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderMsg {
    pub sender: Address,
    /// Client-chosen id, unique among the sender's open orders.
    pub id: String,
    /// `BASE_QUOTE`, e.g. `BTC_BNB`.
    pub symbol: String,
    pub side: Side,
    pub price: i64,
    pub quantity: i64,
    pub time_in_force: TimeInForce,
}

/// Cancel an open order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderMsg {
    pub sender: Address,
    pub symbol: String,
    pub ref_id: String,
}

/// One output of a send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Output {
    pub address: Address,
    pub coins: Coins,
}

/// Move coins to one or more addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SendMsg {
    pub from: Address,
    pub outputs: Vec<Output>,
}

/// A message carried by a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Msg {
    #[serde(rename = "orderNew")]
    NewOrder(NewOrderMsg),
    #[serde(rename = "orderCancel")]
    CancelOrder(CancelOrderMsg),
    #[serde(rename = "send")]
    Send(SendMsg),
}

impl Msg {
    /// Type tag used to look up the message's fee calculator.
    #[must_use]
    pub fn msg_type(&self) -> &'static str {
        match self {
            Self::NewOrder(_) => "orderNew",
            Self::CancelOrder(_) => "orderCancel",
            Self::Send(_) => "send",
        }
    }

    #[must_use]
    pub fn signer(&self) -> Address {
        match self {
            Self::NewOrder(m) => m.sender,
            Self::CancelOrder(m) => m.sender,
            Self::Send(m) => m.from,
        }
    }
}

// ---------------------------------------------------------------------------
// Fee descriptor and signatures
// ---------------------------------------------------------------------------

/// Fee descriptor covered by the signatures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdFee {
    pub amount: Coins,
    pub mode: FeeMode,
    /// Gas limit for admission; `0` leaves admission unmetered.
    pub gas: u64,
}

impl StdFee {
    #[must_use]
    pub fn unmetered() -> Self {
        Self {
            amount: Coins::new(),
            mode: FeeMode::Free,
            gas: 0,
        }
    }
}

/// One signer's signature plus the account state it was made against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdSignature {
    /// Required until the account has a bound key.
    pub pub_key: Option<PubKey>,
    pub signature: Vec<u8>,
    pub account_number: u64,
    pub sequence: u64,
}

impl StdSignature {
    /// Sign `sign_bytes` with `key`, attaching the public key.
    #[must_use]
    pub fn sign(key: &SigningKey, sign_bytes: &[u8], account_number: u64, sequence: u64) -> Self {
        Self {
            pub_key: Some(PubKey::from(&key.verifying_key())),
            signature: key.sign(sign_bytes).to_bytes().to_vec(),
            account_number,
            sequence,
        }
    }
}

#[derive(Serialize)]
struct StdSignDoc<'a> {
    account_number: u64,
    chain_id: &'a str,
    fee: &'a StdFee,
    memo: &'a str,
    msgs: &'a [Msg],
    sequence: u64,
}

// ---------------------------------------------------------------------------
// SignedTransaction
// ---------------------------------------------------------------------------

/// A transaction as submitted to the chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedTransaction {
    pub msgs: Vec<Msg>,
    pub fee: StdFee,
    pub signatures: Vec<StdSignature>,
    pub memo: String,
}

impl SignedTransaction {
    /// Distinct signers in order of first appearance.
    #[must_use]
    pub fn signers(&self) -> Vec<Address> {
        let mut signers: Vec<Address> = Vec::with_capacity(self.msgs.len());
        for msg in &self.msgs {
            let signer = msg.signer();
            if !signers.contains(&signer) {
                signers.push(signer);
            }
        }
        signers
    }

    /// Canonical bytes a signer with the given account state signs.
    pub fn sign_bytes(&self, chain_id: &str, account_number: u64, sequence: u64) -> Result<Vec<u8>> {
        sign_bytes(chain_id, account_number, sequence, &self.fee, &self.msgs, &self.memo)
    }

    pub fn hash(&self) -> Result<TxHash> {
        Ok(TxHash::of(&serde_json::to_vec(self)?))
    }
}

/// Canonical sign payload for a transaction body.
pub fn sign_bytes(
    chain_id: &str,
    account_number: u64,
    sequence: u64,
    fee: &StdFee,
    msgs: &[Msg],
    memo: &str,
) -> Result<Vec<u8>> {
    let doc = StdSignDoc {
        account_number,
        chain_id,
        fee,
        memo,
        msgs,
        sequence,
    };
    Ok(serde_json::to_vec(&doc)?)
}

/// Builds and signs transactions on behalf of one or more keys.
#[derive(Debug, Clone)]
pub struct TxBuilder {
    chain_id: String,
    msgs: Vec<Msg>,
    fee: StdFee,
    memo: String,
}

impl TxBuilder {
    #[must_use]
    pub fn new(chain_id: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            msgs: Vec::new(),
            fee: StdFee::unmetered(),
            memo: String::new(),
        }
    }

    #[must_use]
    pub fn msg(mut self, msg: Msg) -> Self {
        self.msgs.push(msg);
        self
    }

    #[must_use]
    pub fn fee(mut self, fee: StdFee) -> Self {
        self.fee = fee;
        self
    }

    #[must_use]
    pub fn memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    /// Sign with one `(key, account_number, sequence)` per signer, in
    /// signer order.
    pub fn sign(self, signers: &[(&SigningKey, u64, u64)]) -> Result<SignedTransaction> {
        let mut signatures = Vec::with_capacity(signers.len());
        for (key, account_number, sequence) in signers {
            let bytes = sign_bytes(
                &self.chain_id,
                *account_number,
                *sequence,
                &self.fee,
                &self.msgs,
                &self.memo,
            )?;
            signatures.push(StdSignature::sign(key, &bytes, *account_number, *sequence));
        }
        Ok(SignedTransaction {
            msgs: self.msgs,
            fee: self.fee,
            signatures,
            memo: self.memo,
        })
    }
}
