//! src/compute.rs
//!
//! @description
//! Interface of the compute program that fronts the MPC cluster: its program
//! id, the accounts it owns, its error codes, and the instructions this
//! program and the cluster send it.
//!
//! Compute accounts are Borsh-encoded behind an 8-byte discriminator,
//! SHA-256("account:<Name>")[..8], the same layout Anchor uses for its own
//! accounts. `compute_account!` gives each of them Anchor's account traits
//! with `COMPUTE_PROGRAM_ID` as owner, so they can be typed in `Accounts`
//! structs; they are never written back by this program.
//!
//! Instruction data is SHA-256("global:<method>")[..8] followed by the
//! Borsh-encoded arguments.

use anchor_lang::error::ErrorCode;
use anchor_lang::prelude::*;
use anchor_lang::solana_program::hash::hash;
use anchor_lang::solana_program::instruction::Instruction;

use crate::circuit::CircuitKind;
use crate::pda;

/// `6Yf3tvWUVQfu4Ttw4Ym6d6epxhZe1mFAr5EGohsDNHrW`
pub const COMPUTE_PROGRAM_ID: Pubkey = Pubkey::new_from_array([
    82, 102, 118, 128, 22, 247, 210, 163, 74, 116, 12, 252, 175, 232, 232, 117, 72, 204, 80, 250,
    72, 216, 124, 187, 81, 147, 216, 65, 120, 13, 190, 191,
]);

/// Room left in a computation account for its status to grow.
pub const COMPUTATION_SLACK: usize = 16;

/// The 8-byte method tag of `method`.
pub fn sighash(method: &str) -> [u8; 8] {
    let digest = hash(format!("global:{method}").as_bytes()).to_bytes();
    let mut tag = [0u8; 8];
    tag.copy_from_slice(&digest[..8]);
    tag
}

#[error_code(offset = 16384)]
pub enum ComputeErrorCode {
    #[msg("The cluster mempool is full.")]
    MempoolFull,
    #[msg("The calling program did not sign with its signer account.")]
    UnauthorizedCaller,
    #[msg("Signer is not the cluster authority.")]
    InvalidClusterAuthority,
    #[msg("The computation is not in the expected pool.")]
    ComputationNotPooled,
    #[msg("The computation is no longer queued.")]
    ComputationNotQueued,
}

pub trait ComputeAccount: AnchorSerialize + AnchorDeserialize {
    const NAME: &'static str;

    fn discriminator() -> [u8; 8] {
        let digest = hash(format!("account:{}", Self::NAME).as_bytes()).to_bytes();
        let mut discriminator = [0u8; 8];
        discriminator.copy_from_slice(&digest[..8]);
        discriminator
    }

    fn to_account_data(&self) -> Result<Vec<u8>> {
        let mut data = Self::discriminator().to_vec();
        AnchorSerialize::serialize(self, &mut data)
            .map_err(|_| error!(ErrorCode::AccountDidNotSerialize))?;
        Ok(data)
    }

    /// Trailing bytes past the encoded value are ignored; pools are presized.
    fn from_account_data(data: &[u8]) -> Result<Self> {
        require!(
            data.len() >= 8 && data[..8] == Self::discriminator(),
            ErrorCode::AccountDiscriminatorMismatch
        );
        AnchorDeserialize::deserialize(&mut &data[8..])
            .map_err(|_| error!(ErrorCode::AccountDidNotDeserialize))
    }
}

macro_rules! compute_account {
    ($ty:ident, $name:literal) => {
        impl ComputeAccount for $ty {
            const NAME: &'static str = $name;
        }

        impl anchor_lang::Owner for $ty {
            fn owner() -> Pubkey {
                COMPUTE_PROGRAM_ID
            }
        }

        impl anchor_lang::AccountSerialize for $ty {
            fn try_serialize<W: std::io::Write>(&self, writer: &mut W) -> Result<()> {
                writer
                    .write_all(&self.to_account_data()?)
                    .map_err(|_| error!(ErrorCode::AccountDidNotSerialize))
            }
        }

        impl anchor_lang::AccountDeserialize for $ty {
            fn try_deserialize_unchecked(buf: &mut &[u8]) -> Result<Self> {
                Self::from_account_data(buf)
            }
        }
    };
}

/// Capacity selector for a cluster's mempool. Encoded as one byte.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MempoolSize {
    Tiny,
    Small,
    Medium,
    Large,
}

impl MempoolSize {
    pub fn capacity(self) -> usize {
        match self {
            MempoolSize::Tiny => 8,
            MempoolSize::Small => 32,
            MempoolSize::Medium => 128,
            MempoolSize::Large => 512,
        }
    }
}

/// Binds an owning program to the cluster that runs its circuits.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct MxeAccount {
    pub mxe_program: Pubkey,
    pub cluster_offset: u32,
    /// Only this key may deliver callbacks to the owning program.
    pub authority: Pubkey,
    pub mempool_size: MempoolSize,
    pub bump: u8,
}

compute_account!(MxeAccount, "MXEAccount");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct Mempool {
    pub cluster_offset: u32,
    pub capacity: u32,
    /// Offsets of queued computations, oldest first.
    pub queued: Vec<u64>,
}

compute_account!(Mempool, "Mempool");

impl Mempool {
    pub fn space(capacity: usize) -> usize {
        8 + 4 + 4 + 4 + 8 * capacity
    }
}

/// Computations the cluster has picked up and not yet finalized.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ExecutingPool {
    pub cluster_offset: u32,
    pub executing: Vec<u64>,
}

compute_account!(ExecutingPool, "ExecutingPool");

impl ExecutingPool {
    pub fn space(capacity: usize) -> usize {
        8 + 4 + 4 + 8 * capacity
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ClusterAccount {
    pub cluster_offset: u32,
    pub authority: Pubkey,
}

compute_account!(ClusterAccount, "Cluster");

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ComputationDefinitionAccount {
    pub circuit: CircuitKind,
    pub comp_def_offset: u32,
    pub mxe_program: Pubkey,
    pub is_initialized: bool,
}

compute_account!(ComputationDefinitionAccount, "ComputationDefinitionAccount");

/// An account the cluster passes back to the callback instruction.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct CallbackAccount {
    pub pubkey: Pubkey,
    pub is_writable: bool,
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComputationStatus {
    Queued,
    Finalized,
    /// The cluster ran the circuit but the callback was rejected.
    Failed { code: u32 },
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub struct ComputationAccount {
    pub computation_offset: u64,
    pub circuit: CircuitKind,
    pub mxe_program: Pubkey,
    pub comp_def: Pubkey,
    pub payer: Pubkey,
    pub inputs: Vec<u8>,
    pub callback_accounts: Vec<CallbackAccount>,
    pub status: ComputationStatus,
    pub queued_slot: u64,
    pub finalized_slot: Option<u64>,
}

compute_account!(ComputationAccount, "ComputationAccount");

/// Instructions of the compute program.
#[derive(AnchorSerialize, AnchorDeserialize, Clone, Debug, PartialEq, Eq)]
pub enum ComputeInstruction {
    InitMxe {
        mxe_program: Pubkey,
        cluster_offset: u32,
        authority: Pubkey,
        mempool_size: MempoolSize,
    },
    InitComputationDefinition {
        circuit: CircuitKind,
    },
    QueueComputation {
        computation_offset: u64,
        circuit: CircuitKind,
        inputs: Vec<u8>,
        callback_accounts: Vec<CallbackAccount>,
    },
    /// Moves a computation from the mempool to the executing pool.
    ClaimComputation {
        computation_offset: u64,
    },
    FinalizeComputation {
        computation_offset: u64,
        status: ComputationStatus,
    },
}

const METHODS: [&str; 5] = [
    "init_mxe",
    "init_computation_definition",
    "queue_computation",
    "claim_computation",
    "finalize_computation",
];

fn args<T: AnchorDeserialize>(data: &mut &[u8]) -> Result<T> {
    let value = T::deserialize(data).map_err(|_| error!(ErrorCode::InstructionDidNotDeserialize))?;
    require!(data.is_empty(), ErrorCode::InstructionDidNotDeserialize);
    Ok(value)
}

impl ComputeInstruction {
    pub fn method(&self) -> &'static str {
        match self {
            ComputeInstruction::InitMxe { .. } => METHODS[0],
            ComputeInstruction::InitComputationDefinition { .. } => METHODS[1],
            ComputeInstruction::QueueComputation { .. } => METHODS[2],
            ComputeInstruction::ClaimComputation { .. } => METHODS[3],
            ComputeInstruction::FinalizeComputation { .. } => METHODS[4],
        }
    }

    /// The method named by the tag of `data`, if it is one of ours.
    pub fn method_of(data: &[u8]) -> Option<&'static str> {
        let tag = data.get(..8)?;
        METHODS.into_iter().find(|method| tag == sighash(method))
    }

    pub fn data(&self) -> Result<Vec<u8>> {
        let mut data = sighash(self.method()).to_vec();
        let written = match self {
            ComputeInstruction::InitMxe {
                mxe_program,
                cluster_offset,
                authority,
                mempool_size,
            } => (mxe_program, cluster_offset, authority, mempool_size).serialize(&mut data),
            ComputeInstruction::InitComputationDefinition { circuit } => circuit.serialize(&mut data),
            ComputeInstruction::QueueComputation {
                computation_offset,
                circuit,
                inputs,
                callback_accounts,
            } => (computation_offset, circuit, inputs, callback_accounts).serialize(&mut data),
            ComputeInstruction::ClaimComputation { computation_offset } => {
                computation_offset.serialize(&mut data)
            }
            ComputeInstruction::FinalizeComputation {
                computation_offset,
                status,
            } => (computation_offset, status).serialize(&mut data),
        };
        written.map_err(|_| error!(ErrorCode::InstructionDidNotSerialize))?;
        Ok(data)
    }

    pub fn decode(data: &[u8]) -> Result<Self> {
        require!(data.len() >= 8, ErrorCode::InstructionMissing);
        let method = Self::method_of(data).ok_or_else(|| error!(ErrorCode::InstructionFallbackNotFound))?;
        let rest = &mut &data[8..];
        let instruction = match method {
            "init_mxe" => {
                let (mxe_program, cluster_offset, authority, mempool_size) = args(rest)?;
                ComputeInstruction::InitMxe {
                    mxe_program,
                    cluster_offset,
                    authority,
                    mempool_size,
                }
            }
            "init_computation_definition" => {
                ComputeInstruction::InitComputationDefinition { circuit: args(rest)? }
            }
            "queue_computation" => {
                let (computation_offset, circuit, inputs, callback_accounts) = args(rest)?;
                ComputeInstruction::QueueComputation {
                    computation_offset,
                    circuit,
                    inputs,
                    callback_accounts,
                }
            }
            "claim_computation" => ComputeInstruction::ClaimComputation {
                computation_offset: args(rest)?,
            },
            _ => {
                let (computation_offset, status) = args(rest)?;
                ComputeInstruction::FinalizeComputation {
                    computation_offset,
                    status,
                }
            }
        };
        Ok(instruction)
    }

    /// Provisions the MXE of `mxe_program` on cluster `cluster_offset`.
    pub fn init_mxe(
        payer: Pubkey,
        mxe_program: Pubkey,
        cluster_offset: u32,
        authority: Pubkey,
        mempool_size: MempoolSize,
    ) -> Result<Instruction> {
        let ix = ComputeInstruction::InitMxe {
            mxe_program,
            cluster_offset,
            authority,
            mempool_size,
        };
        Ok(Instruction {
            program_id: COMPUTE_PROGRAM_ID,
            accounts: vec![
                AccountMeta::new(payer, true),
                AccountMeta::new(pda::mxe(&mxe_program).0, false),
                AccountMeta::new(pda::mempool(cluster_offset).0, false),
                AccountMeta::new(pda::execpool(cluster_offset).0, false),
                AccountMeta::new(pda::cluster(cluster_offset).0, false),
                AccountMeta::new_readonly(anchor_lang::system_program::ID, false),
            ],
            data: ix.data()?,
        })
    }

    /// The cluster picks up computation `computation_offset`.
    pub fn claim_computation(
        authority: Pubkey,
        cluster_offset: u32,
        computation_offset: u64,
    ) -> Result<Instruction> {
        let ix = ComputeInstruction::ClaimComputation { computation_offset };
        Ok(Instruction {
            program_id: COMPUTE_PROGRAM_ID,
            accounts: vec![
                AccountMeta::new(authority, true),
                AccountMeta::new_readonly(pda::cluster(cluster_offset).0, false),
                AccountMeta::new(pda::mempool(cluster_offset).0, false),
                AccountMeta::new(pda::execpool(cluster_offset).0, false),
            ],
            data: ix.data()?,
        })
    }

    /// The cluster records the outcome of computation `computation_offset`.
    pub fn finalize_computation(
        authority: Pubkey,
        cluster_offset: u32,
        computation_offset: u64,
        status: ComputationStatus,
    ) -> Result<Instruction> {
        let ix = ComputeInstruction::FinalizeComputation {
            computation_offset,
            status,
        };
        Ok(Instruction {
            program_id: COMPUTE_PROGRAM_ID,
            accounts: vec![
                AccountMeta::new(authority, true),
                AccountMeta::new_readonly(pda::cluster(cluster_offset).0, false),
                AccountMeta::new(pda::execpool(cluster_offset).0, false),
                AccountMeta::new(pda::computation(cluster_offset, computation_offset).0, false),
            ],
            data: ix.data()?,
        })
    }
}
