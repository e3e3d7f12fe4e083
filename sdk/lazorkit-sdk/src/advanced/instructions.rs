use crate::error::Result;
use crate::utils::{derive_smart_wallet, derive_smart_wallet_authority};
use lazorkit_interface::{PasskeyPubkey, SmartWalletInstruction, VerifyParam};
use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::{system_program, sysvar};

pub fn init_smart_wallet(
    program_id: &Pubkey,
    payer: &Pubkey,
    passkey: PasskeyPubkey,
    id: u64,
) -> Result<Instruction> {
    let (smart_wallet, _) = derive_smart_wallet(program_id, id);
    let (authority, _) = derive_smart_wallet_authority(program_id, &passkey, &smart_wallet);

    let instruction = SmartWalletInstruction::InitSmartWallet { pubkey: passkey, id };

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new(smart_wallet, false),
        AccountMeta::new(authority, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.pack()?,
    })
}

/// Wrap `cpi` so the program executes it as `smart_wallet` after verifying `verify`.
///
/// The wrapped instruction's accounts are passed through as remaining
/// accounts. Only the payer keeps its signer flag; the wallet PDA is signed
/// for by the program.
pub fn verify_and_execute(
    program_id: &Pubkey,
    payer: &Pubkey,
    smart_wallet: &Pubkey,
    smart_wallet_authority: &Pubkey,
    verify: VerifyParam,
    cpi: &Instruction,
) -> Result<Instruction> {
    let instruction = SmartWalletInstruction::VerifyAndExecuteInstruction {
        verify,
        data: cpi.data.clone(),
    };

    let mut accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
        AccountMeta::new(*smart_wallet, false),
        AccountMeta::new(*smart_wallet_authority, false),
        AccountMeta::new_readonly(cpi.program_id, false),
    ];
    accounts.extend(cpi.accounts.iter().map(|meta| AccountMeta {
        pubkey: meta.pubkey,
        is_signer: meta.is_signer && meta.pubkey == *payer,
        is_writable: meta.is_writable,
    }));

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.pack()?,
    })
}

pub fn add_authenticators(
    program_id: &Pubkey,
    payer: &Pubkey,
    smart_wallet: &Pubkey,
    smart_wallet_authority: &Pubkey,
    verify: VerifyParam,
    new_passkey: PasskeyPubkey,
) -> Result<Instruction> {
    let (new_authority, _) = derive_smart_wallet_authority(program_id, &new_passkey, smart_wallet);

    let instruction = SmartWalletInstruction::AddAuthenticators {
        verify,
        new_passkey,
    };

    let accounts = vec![
        AccountMeta::new(*payer, true),
        AccountMeta::new_readonly(sysvar::instructions::id(), false),
        AccountMeta::new(*smart_wallet, false),
        AccountMeta::new(*smart_wallet_authority, false),
        AccountMeta::new(new_authority, false),
        AccountMeta::new_readonly(system_program::id(), false),
    ];

    Ok(Instruction {
        program_id: *program_id,
        accounts,
        data: instruction.pack()?,
    })
}
