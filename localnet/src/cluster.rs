//! src/cluster.rs
//!
//! @description
//! In-process stand-in for the MPC cluster.
//!
//! @logic
//! Computations leave the mempool in FIFO order once `latency_slots` have
//! passed since they were queued. For each one the cluster claims it into the
//! executing pool, opens the inputs, runs the circuit from `aces_circuits`,
//! seals the outputs and submits the callback together with the finalization,
//! both signed by the cluster authority. A computation whose circuit or
//! callback fails is finalized as failed with the error code.
//!
//! Sealing is a keyed keystream (SHA-256 over key, nonce and block counter).
//! Anyone holding the key can open it; the real cluster's threshold
//! encryption is out of scope here.

use std::collections::{HashMap, VecDeque};

use aces_circuits::{Deck, Hand};
use aces_table::circuit::{
    CircuitKind, EvaluateHandsAndPayoutOutput, EvaluateHandsInput, RevealCommunityCardsInput,
    RevealCommunityCardsOutput, SealedCards, ShuffleAndDealInput, ShuffleAndDealOutput,
};
use aces_table::compute::{ComputationAccount, ComputationStatus, ComputeInstruction};
use aces_table::state::MAX_PLAYERS;
use aces_table::{instruction, pda, AcesTableErrorCode};
use anchor_lang::prelude::Pubkey;
use anchor_lang::solana_program::hash::hashv;
use anchor_lang::solana_program::instruction::{AccountMeta, Instruction};
use anchor_lang::{AnchorDeserialize, InstructionData};
use anyhow::anyhow;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use solana_sdk::signature::Keypair;
use solana_sdk::signer::keypair::keypair_from_seed;
use solana_sdk::signer::Signer;
use tracing::warn;

/// Callbacks kept for redelivery, oldest evicted first.
pub const DELIVERED_CAPACITY: usize = 64;

/// XORs `data` with the keystream of `key` and `nonce`.
pub(crate) fn apply_keystream(key: &[u8; 32], nonce: u128, data: &mut [u8]) {
    for (counter, block) in data.chunks_mut(32).enumerate() {
        let pad = hashv(&[
            key.as_slice(),
            &nonce.to_le_bytes()[..],
            &(counter as u32).to_le_bytes()[..],
        ])
        .to_bytes();
        for (byte, mask) in block.iter_mut().zip(pad) {
            *byte ^= mask;
        }
    }
}

fn sealed<const N: usize>(key: &[u8; 32], nonce: u128, mut data: [u8; N]) -> [u8; N] {
    apply_keystream(key, nonce, &mut data);
    data
}

/// The most recent callbacks the cluster delivered, by computation address.
pub(crate) struct Delivered {
    capacity: usize,
    order: VecDeque<Pubkey>,
    callbacks: HashMap<Pubkey, Instruction>,
}

impl Delivered {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            callbacks: HashMap::with_capacity(capacity),
        }
    }

    pub fn insert(&mut self, computation: Pubkey, callback: Instruction) {
        if self.callbacks.insert(computation, callback).is_none() {
            self.order.push_back(computation);
        }
        while self.order.len() > self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.callbacks.remove(&evicted);
            }
        }
    }

    pub fn get(&self, computation: &Pubkey) -> Option<&Instruction> {
        self.callbacks.get(computation)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.callbacks.len()
    }
}

/// What the cluster wants submitted for one computation.
pub(crate) enum Outcome {
    /// The callback followed by the finalization.
    Deliver {
        callback: Instruction,
        finalize: Instruction,
    },
    /// The circuit itself failed.
    Abort { finalize: Instruction },
}

pub(crate) struct Cluster {
    offset: u32,
    authority: Keypair,
    /// Key sealing the deck between reveals.
    key: [u8; 32],
    latency_slots: u64,
    held: bool,
    rng: StdRng,
    delivered: Delivered,
}

impl Cluster {
    pub fn new(offset: u32, latency_slots: u64, seed: u64) -> anyhow::Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let authority_seed: [u8; 32] = rng.gen();
        let authority = keypair_from_seed(&authority_seed)
            .map_err(|err| anyhow!("deriving cluster authority: {err}"))?;
        let key = rng.gen();
        Ok(Self {
            offset,
            authority,
            key,
            latency_slots,
            held: false,
            rng,
            delivered: Delivered::with_capacity(DELIVERED_CAPACITY),
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn authority(&self) -> &Keypair {
        &self.authority
    }

    /// While held, queued computations stay in the mempool.
    pub fn hold(&mut self, held: bool) {
        self.held = held;
    }

    pub fn is_held(&self) -> bool {
        self.held
    }

    /// First slot at which `computation` may run.
    pub fn due_slot(&self, computation: &ComputationAccount) -> u64 {
        computation.queued_slot.saturating_add(self.latency_slots)
    }

    pub fn claim(&self, computation_offset: u64) -> anyhow::Result<Instruction> {
        ComputeInstruction::claim_computation(
            self.authority.pubkey(),
            self.offset,
            computation_offset,
        )
        .map_err(|err| anyhow!("building claim_computation: {err}"))
    }

    pub fn finalize(
        &self,
        computation_offset: u64,
        status: ComputationStatus,
    ) -> anyhow::Result<Instruction> {
        ComputeInstruction::finalize_computation(
            self.authority.pubkey(),
            self.offset,
            computation_offset,
            status,
        )
        .map_err(|err| anyhow!("building finalize_computation: {err}"))
    }

    /// Runs the circuit of `computation` and prepares its delivery.
    pub fn execute(&mut self, computation: &ComputationAccount) -> anyhow::Result<Outcome> {
        let offset = computation.computation_offset;
        match self.evaluate(computation) {
            Ok(data) => Ok(Outcome::Deliver {
                callback: self.callback(computation, data),
                finalize: self.finalize(offset, ComputationStatus::Finalized)?,
            }),
            Err(err) => {
                warn!(circuit = %computation.circuit, offset, error = %err, "circuit failed");
                let code = u32::from(AcesTableErrorCode::AbortedComputation);
                Ok(Outcome::Abort {
                    finalize: self.finalize(offset, ComputationStatus::Failed { code })?,
                })
            }
        }
    }

    pub fn record_delivery(&mut self, computation_offset: u64, callback: Instruction) {
        let key = pda::computation(self.offset, computation_offset).0;
        self.delivered.insert(key, callback);
    }

    /// The callback already delivered for the computation at `key`.
    pub fn delivered(&self, key: &Pubkey) -> Option<&Instruction> {
        self.delivered.get(key)
    }

    pub fn callback(&self, computation: &ComputationAccount, data: Vec<u8>) -> Instruction {
        let mut accounts = vec![
            AccountMeta::new(self.authority.pubkey(), true),
            AccountMeta::new_readonly(pda::mxe(&computation.mxe_program).0, false),
            AccountMeta::new_readonly(computation.comp_def, false),
            AccountMeta::new_readonly(
                pda::computation(self.offset, computation.computation_offset).0,
                false,
            ),
        ];
        accounts.extend(computation.callback_accounts.iter().map(|account| {
            if account.is_writable {
                AccountMeta::new(account.pubkey, false)
            } else {
                AccountMeta::new_readonly(account.pubkey, false)
            }
        }));
        Instruction {
            program_id: computation.mxe_program,
            accounts,
            data,
        }
    }

    /// Opens the inputs, runs the circuit and returns the sealed callback data.
    fn evaluate(&mut self, computation: &ComputationAccount) -> anyhow::Result<Vec<u8>> {
        let mut inputs = computation.inputs.as_slice();
        let data = match computation.circuit {
            CircuitKind::ShuffleAndDeal => {
                let input = ShuffleAndDealInput::deserialize(&mut inputs)?;
                let deal = aces_circuits::shuffle_and_deal(&mut self.rng, input.active_seats)?;
                let deck_nonce: u128 = self.rng.gen();
                let encrypted_deck =
                    sealed(&self.key, deck_nonce, Deck::from_array(&deal.deck)?.to_bytes());
                let shuffle_commitment =
                    hashv(&[&encrypted_deck[..], &deck_nonce.to_le_bytes()[..]]).to_bytes();

                let mut hands = [None; MAX_PLAYERS];
                for (seat, cards) in deal.hands.iter().enumerate() {
                    let Some(cards) = cards else { continue };
                    let encryption_key = input.seat_keys[seat];
                    let nonce: u128 = self.rng.gen();
                    hands[seat] = Some(SealedCards {
                        ciphertext: sealed(&encryption_key, nonce, Hand::from_array(*cards).to_bytes()),
                        nonce,
                        encryption_key,
                    });
                }
                instruction::ShuffleAndDealCallback {
                    output: ShuffleAndDealOutput {
                        encrypted_deck,
                        deck_nonce,
                        shuffle_commitment,
                        hands,
                        deck_top: deal.deck_top,
                    },
                }
                .data()
            }
            CircuitKind::RevealCommunityCards => {
                let input = RevealCommunityCardsInput::deserialize(&mut inputs)?;
                let deck = Deck::from_bytes(&sealed(&self.key, input.deck_nonce, input.encrypted_deck));
                let reveal =
                    aces_circuits::reveal_community_cards(deck.to_array(), input.deck_top, input.count)?;
                let deck_nonce: u128 = self.rng.gen();
                let encrypted_deck =
                    sealed(&self.key, deck_nonce, Deck::from_array(&reveal.deck)?.to_bytes());
                instruction::RevealCommunityCardsCallback {
                    output: RevealCommunityCardsOutput {
                        cards: reveal.cards,
                        encrypted_deck,
                        deck_nonce,
                        deck_top: reveal.deck_top,
                    },
                }
                .data()
            }
            CircuitKind::EvaluateHandsAndPayout => {
                let input = EvaluateHandsInput::deserialize(&mut inputs)?;
                let hole_cards = input.hands.map(|hand| {
                    hand.map(|hand| {
                        Hand::from_bytes(sealed(&hand.encryption_key, hand.nonce, hand.ciphertext))
                            .to_array()
                    })
                });
                let showdown = aces_circuits::evaluate_hands_and_payout(
                    hole_cards,
                    input.community_cards,
                    input.bets,
                    input.contenders,
                    input.dealer,
                    input.rake,
                )?;
                let hand_ranks = showdown
                    .ranks
                    .map(|rank| rank.map_or(u8::MAX, |rank| rank.category()));
                instruction::EvaluateHandsAndPayoutCallback {
                    output: EvaluateHandsAndPayoutOutput {
                        payouts: showdown.payouts,
                        hand_ranks,
                    },
                }
                .data()
            }
        };
        Ok(data)
    }
}
