//! Soroban (Stellar) emitter.
//!
//! Produces a `#![no_std]` contract crate root. The skeleton declares the
//! contract struct, its storage keys and one `#[contractimpl]` block with the
//! token surface, plus private helpers (`require_admin`, `before_transfer`,
//! mint/burn internals) that carry the guard lines for enabled blocks. Each
//! feature fragment adds its own storage key enum (when it needs state) and
//! its own `#[contractimpl]` block.

use blockforge_types::{BlockType, TargetLanguage};

use crate::generator::ContractEmitter;
use crate::plan::{BasePlan, ContractPlan, Feature};
use crate::writer::SourceBuf;

/// Import line every generated Soroban contract starts with.
pub const SOROBAN_IMPORTS: &str =
    "use soroban_sdk::{contract, contractimpl, contracttype, Address, Env, String};";

/// Emits Soroban Rust source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SorobanEmitter;

impl ContractEmitter for SorobanEmitter {
    fn target(&self) -> TargetLanguage {
        TargetLanguage::RustSoroban
    }

    fn emit(&self, plan: &ContractPlan) -> String {
        let mut out = SourceBuf::new();

        out.line("// SPDX-License-Identifier: MIT");
        out.line(format!("//! {}: generated by Blockforge.", plan.contract_name));
        out.line("#![no_std]");
        out.blank();
        out.line(SOROBAN_IMPORTS);
        out.blank();

        match &plan.base {
            BasePlan::Token {
                decimals,
                initial_supply,
            } => token_skeleton(&mut out, plan, *decimals, *initial_supply),
            BasePlan::Nft { base_uri } => nft_skeleton(&mut out, plan, base_uri),
        }

        for feature in &plan.features {
            out.blank();
            out.line(format!("// ── {} ──", feature.block_type()));
            out.blank();
            feature_fragment(&mut out, plan, feature);
        }

        out.finish()
    }
}

// ── Shared Pieces ──────────────────────────────────────────────────────

fn contract_decl(out: &mut SourceBuf, name: &str) {
    out.line("#[contract]");
    out.line(format!("pub struct {};", name));
    out.blank();
}

fn require_admin(out: &mut SourceBuf) {
    out.open("fn require_admin(env: &Env) -> Address {");
    out.line("let admin: Address = env.storage().instance().get(&DataKey::Admin).unwrap();");
    out.line("admin.require_auth();");
    out.line("admin");
    out.close("}");
}

/// Guard helper: `to` is `None` for burns.
fn before_transfer(out: &mut SourceBuf, plan: &ContractPlan) {
    let pausable = plan.has(BlockType::Pausable);
    let whitelist = plan.has(BlockType::Whitelist);

    if !pausable && !whitelist {
        out.line("fn before_transfer(_env: &Env, _to: Option<&Address>) {}");
        return;
    }

    let to = if whitelist { "to" } else { "_to" };
    out.open(format!(
        "fn before_transfer(env: &Env, {}: Option<&Address>) {{",
        to
    ));
    if pausable {
        out.open("if env.storage().instance().get::<_, bool>(&PausableKey::Paused).unwrap_or(false) {");
        out.line("panic!(\"contract is paused\");");
        out.close("}");
    }
    if whitelist {
        out.open("if let Some(to) = to {");
        out.line("let allowed: bool = env");
        out.line("    .storage()");
        out.line("    .persistent()");
        out.line("    .get(&WhitelistKey::Allowed(to.clone()))");
        out.line("    .unwrap_or(false);");
        out.open("if !allowed {");
        out.line("panic!(\"recipient not whitelisted\");");
        out.close("}");
        out.close("}");
    }
    out.close("}");
}

fn string_getter(out: &mut SourceBuf, func: &str, key: &str) {
    out.open(format!("pub fn {}(env: Env) -> String {{", func));
    out.line(format!(
        "env.storage().instance().get(&DataKey::{}).unwrap()",
        key
    ));
    out.close("}");
}

// ── Fungible Token Skeleton ────────────────────────────────────────────

fn token_skeleton(out: &mut SourceBuf, plan: &ContractPlan, decimals: u8, initial_supply: u64) {
    let name = &plan.contract_name;

    out.line("#[contracttype]");
    out.line("#[derive(Clone)]");
    out.open("pub enum DataKey {");
    out.line("Admin,");
    out.line("Name,");
    out.line("Symbol,");
    out.line("Decimals,");
    out.line("TotalSupply,");
    out.line("Balance(Address),");
    out.line("Allowance(Address, Address),");
    out.close("}");
    out.blank();

    contract_decl(out, name);

    out.line("#[contractimpl]");
    out.open(format!("impl {} {{", name));

    out.open("pub fn initialize(env: Env, admin: Address) {");
    out.open("if env.storage().instance().has(&DataKey::Admin) {");
    out.line("panic!(\"already initialized\");");
    out.close("}");
    out.line("env.storage().instance().set(&DataKey::Admin, &admin);");
    if plan.has(BlockType::Whitelist) {
        out.line("env.storage().persistent().set(&WhitelistKey::Allowed(admin.clone()), &true);");
    }
    out.line(format!(
        "env.storage().instance().set(&DataKey::Name, &String::from_str(&env, \"{}\"));",
        name
    ));
    out.line(format!(
        "env.storage().instance().set(&DataKey::Symbol, &String::from_str(&env, \"{}\"));",
        plan.symbol
    ));
    out.line(format!(
        "env.storage().instance().set(&DataKey::Decimals, &{}u32);",
        decimals
    ));
    if initial_supply > 0 {
        out.line(format!(
            "Self::mint_to(&env, &admin, {}i128 * 10i128.pow({}));",
            initial_supply, decimals
        ));
    }
    out.close("}");
    out.blank();

    string_getter(out, "name", "Name");
    out.blank();
    string_getter(out, "symbol", "Symbol");
    out.blank();

    out.open("pub fn decimals(env: Env) -> u32 {");
    out.line("env.storage().instance().get(&DataKey::Decimals).unwrap()");
    out.close("}");
    out.blank();

    out.open("pub fn total_supply(env: Env) -> i128 {");
    out.line("env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0)");
    out.close("}");
    out.blank();

    out.open("pub fn balance(env: Env, id: Address) -> i128 {");
    out.line("Self::read_balance(&env, &id)");
    out.close("}");
    out.blank();

    out.open("pub fn allowance(env: Env, from: Address, spender: Address) -> i128 {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .get(&DataKey::Allowance(from, spender))");
    out.line("    .unwrap_or(0)");
    out.close("}");
    out.blank();

    out.open("pub fn approve(env: Env, from: Address, spender: Address, amount: i128) {");
    out.line("from.require_auth();");
    out.open("if amount < 0 {");
    out.line("panic!(\"negative amount\");");
    out.close("}");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .set(&DataKey::Allowance(from, spender), &amount);");
    out.close("}");
    out.blank();

    out.open("pub fn transfer(env: Env, from: Address, to: Address, amount: i128) {");
    out.line("from.require_auth();");
    out.line("Self::move_balance(&env, &from, &to, amount);");
    out.close("}");
    out.blank();

    out.open(
        "pub fn transfer_from(env: Env, spender: Address, from: Address, to: Address, amount: i128) {",
    );
    out.line("spender.require_auth();");
    out.line("let allowed = Self::allowance(env.clone(), from.clone(), spender.clone());");
    out.open("if allowed < amount {");
    out.line("panic!(\"insufficient allowance\");");
    out.close("}");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .set(&DataKey::Allowance(from.clone(), spender), &(allowed - amount));");
    out.line("Self::move_balance(&env, &from, &to, amount);");
    out.close("}");
    out.blank();

    out.open("pub fn admin(env: Env) -> Address {");
    out.line("env.storage().instance().get(&DataKey::Admin).unwrap()");
    out.close("}");
    out.close("}");
    out.blank();

    out.open(format!("impl {} {{", name));
    require_admin(out);
    out.blank();
    before_transfer(out, plan);
    out.blank();

    out.open("fn read_balance(env: &Env, id: &Address) -> i128 {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .get(&DataKey::Balance(id.clone()))");
    out.line("    .unwrap_or(0)");
    out.close("}");
    out.blank();

    out.open("fn write_balance(env: &Env, id: &Address, amount: i128) {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .set(&DataKey::Balance(id.clone()), &amount);");
    out.close("}");
    out.blank();

    out.open("fn move_balance(env: &Env, from: &Address, to: &Address, amount: i128) {");
    out.open("if amount < 0 {");
    out.line("panic!(\"negative amount\");");
    out.close("}");
    out.line("Self::before_transfer(env, Some(to));");
    out.line("let from_balance = Self::read_balance(env, from);");
    out.open("if from_balance < amount {");
    out.line("panic!(\"insufficient balance\");");
    out.close("}");
    out.line("Self::write_balance(env, from, from_balance - amount);");
    out.line("Self::write_balance(env, to, Self::read_balance(env, to) + amount);");
    out.close("}");
    out.blank();

    out.open("fn mint_to(env: &Env, to: &Address, amount: i128) {");
    out.open("if amount < 0 {");
    out.line("panic!(\"negative amount\");");
    out.close("}");
    out.line("Self::before_transfer(env, Some(to));");
    out.line("let supply: i128 = env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0);");
    if plan.max_supply().is_some() {
        out.open("if supply + amount > MAX_SUPPLY {");
        out.line("panic!(\"cap exceeded\");");
        out.close("}");
    }
    out.line("env.storage().instance().set(&DataKey::TotalSupply, &(supply + amount));");
    out.line("Self::write_balance(env, to, Self::read_balance(env, to) + amount);");
    out.close("}");
    out.blank();

    out.open("fn burn_from(env: &Env, from: &Address, amount: i128) {");
    out.open("if amount < 0 {");
    out.line("panic!(\"negative amount\");");
    out.close("}");
    out.line("Self::before_transfer(env, None);");
    out.line("let balance = Self::read_balance(env, from);");
    out.open("if balance < amount {");
    out.line("panic!(\"burn amount exceeds balance\");");
    out.close("}");
    out.line("Self::write_balance(env, from, balance - amount);");
    out.line("let supply: i128 = env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0);");
    out.line("env.storage().instance().set(&DataKey::TotalSupply, &(supply - amount));");
    out.close("}");
    out.close("}");
}

// ── NFT Skeleton ───────────────────────────────────────────────────────

fn nft_skeleton(out: &mut SourceBuf, plan: &ContractPlan, base_uri: &str) {
    let name = &plan.contract_name;

    out.line("#[contracttype]");
    out.line("#[derive(Clone)]");
    out.open("pub enum DataKey {");
    out.line("Admin,");
    out.line("Name,");
    out.line("Symbol,");
    out.line("BaseUri,");
    out.line("NextTokenId,");
    out.line("TotalSupply,");
    out.line("Owner(u32),");
    out.line("Balance(Address),");
    out.line("Approved(u32),");
    out.close("}");
    out.blank();

    contract_decl(out, name);

    out.line("#[contractimpl]");
    out.open(format!("impl {} {{", name));

    out.open("pub fn initialize(env: Env, admin: Address) {");
    out.open("if env.storage().instance().has(&DataKey::Admin) {");
    out.line("panic!(\"already initialized\");");
    out.close("}");
    out.line("env.storage().instance().set(&DataKey::Admin, &admin);");
    if plan.has(BlockType::Whitelist) {
        out.line("env.storage().persistent().set(&WhitelistKey::Allowed(admin.clone()), &true);");
    }
    out.line(format!(
        "env.storage().instance().set(&DataKey::Name, &String::from_str(&env, \"{}\"));",
        name
    ));
    out.line(format!(
        "env.storage().instance().set(&DataKey::Symbol, &String::from_str(&env, \"{}\"));",
        plan.symbol
    ));
    out.line(format!(
        "env.storage().instance().set(&DataKey::BaseUri, &String::from_str(&env, \"{}\"));",
        base_uri
    ));
    out.close("}");
    out.blank();

    string_getter(out, "name", "Name");
    out.blank();
    string_getter(out, "symbol", "Symbol");
    out.blank();
    string_getter(out, "base_uri", "BaseUri");
    out.blank();

    out.open("pub fn total_supply(env: Env) -> u32 {");
    out.line("env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0)");
    out.close("}");
    out.blank();

    out.open("pub fn owner_of(env: Env, token_id: u32) -> Address {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .get(&DataKey::Owner(token_id))");
    out.line("    .unwrap_or_else(|| panic!(\"nonexistent token\"))");
    out.close("}");
    out.blank();

    out.open("pub fn balance(env: Env, owner: Address) -> u32 {");
    out.line("Self::read_balance(&env, &owner)");
    out.close("}");
    out.blank();

    out.open("pub fn get_approved(env: Env, token_id: u32) -> Option<Address> {");
    out.line("env.storage().persistent().get(&DataKey::Approved(token_id))");
    out.close("}");
    out.blank();

    out.open("pub fn approve(env: Env, owner: Address, to: Address, token_id: u32) {");
    out.line("owner.require_auth();");
    out.open("if Self::owner_of(env.clone(), token_id) != owner {");
    out.line("panic!(\"not token owner\");");
    out.close("}");
    out.line("env.storage().persistent().set(&DataKey::Approved(token_id), &to);");
    out.close("}");
    out.blank();

    out.open("pub fn transfer(env: Env, from: Address, to: Address, token_id: u32) {");
    out.line("from.require_auth();");
    out.line("Self::move_token(&env, &from, &to, token_id);");
    out.close("}");
    out.blank();

    out.open(
        "pub fn transfer_from(env: Env, spender: Address, from: Address, to: Address, token_id: u32) {",
    );
    out.line("spender.require_auth();");
    out.open("if Self::get_approved(env.clone(), token_id) != Some(spender) {");
    out.line("panic!(\"not approved\");");
    out.close("}");
    out.line("Self::move_token(&env, &from, &to, token_id);");
    out.close("}");
    out.blank();

    out.open("pub fn admin(env: Env) -> Address {");
    out.line("env.storage().instance().get(&DataKey::Admin).unwrap()");
    out.close("}");
    out.close("}");
    out.blank();

    out.open(format!("impl {} {{", name));
    require_admin(out);
    out.blank();
    before_transfer(out, plan);
    out.blank();

    out.open("fn read_balance(env: &Env, owner: &Address) -> u32 {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .get(&DataKey::Balance(owner.clone()))");
    out.line("    .unwrap_or(0)");
    out.close("}");
    out.blank();

    out.open("fn write_balance(env: &Env, owner: &Address, balance: u32) {");
    out.line("env.storage()");
    out.line("    .persistent()");
    out.line("    .set(&DataKey::Balance(owner.clone()), &balance);");
    out.close("}");
    out.blank();

    out.open("fn move_token(env: &Env, from: &Address, to: &Address, token_id: u32) {");
    out.open("if Self::owner_of(env.clone(), token_id) != *from {");
    out.line("panic!(\"transfer from incorrect owner\");");
    out.close("}");
    out.line("Self::before_transfer(env, Some(to));");
    out.line("env.storage().persistent().remove(&DataKey::Approved(token_id));");
    out.line("env.storage().persistent().set(&DataKey::Owner(token_id), to);");
    out.line("Self::write_balance(env, from, Self::read_balance(env, from) - 1);");
    out.line("Self::write_balance(env, to, Self::read_balance(env, to) + 1);");
    out.close("}");
    out.blank();

    out.open("fn mint_next(env: &Env, to: &Address) -> u32 {");
    out.line("Self::before_transfer(env, Some(to));");
    out.line("let supply: u32 = env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0);");
    if plan.max_supply().is_some() {
        out.open("if supply as u64 >= MAX_SUPPLY {");
        out.line("panic!(\"cap exceeded\");");
        out.close("}");
    }
    out.line("let token_id: u32 = env.storage().instance().get(&DataKey::NextTokenId).unwrap_or(0);");
    out.line("env.storage().instance().set(&DataKey::NextTokenId, &(token_id + 1));");
    out.line("env.storage().instance().set(&DataKey::TotalSupply, &(supply + 1));");
    out.line("env.storage().persistent().set(&DataKey::Owner(token_id), to);");
    out.line("Self::write_balance(env, to, Self::read_balance(env, to) + 1);");
    out.line("token_id");
    out.close("}");
    out.blank();

    out.open("fn burn_token(env: &Env, token_id: u32) {");
    out.line("let owner = Self::owner_of(env.clone(), token_id);");
    out.line("Self::before_transfer(env, None);");
    out.line("env.storage().persistent().remove(&DataKey::Approved(token_id));");
    out.line("env.storage().persistent().remove(&DataKey::Owner(token_id));");
    out.line("Self::write_balance(env, &owner, Self::read_balance(env, &owner) - 1);");
    out.line("let supply: u32 = env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0);");
    out.line("env.storage().instance().set(&DataKey::TotalSupply, &(supply - 1));");
    out.close("}");
    out.close("}");
}

// ── Feature Fragments ──────────────────────────────────────────────────

fn feature_fragment(out: &mut SourceBuf, plan: &ContractPlan, feature: &Feature) {
    let name = &plan.contract_name;
    let nft = plan.is_nft();

    match feature {
        Feature::Mint => {
            out.line("#[contractimpl]");
            out.open(format!("impl {} {{", name));
            if nft {
                out.open("pub fn mint(env: Env, to: Address) -> u32 {");
                out.line("Self::require_admin(&env);");
                out.line("Self::mint_next(&env, &to)");
            } else {
                out.open("pub fn mint(env: Env, to: Address, amount: i128) {");
                out.line("Self::require_admin(&env);");
                out.line("Self::mint_to(&env, &to, amount);");
            }
            out.close("}");
            out.close("}");
        }
        Feature::Burn => {
            out.line("#[contractimpl]");
            out.open(format!("impl {} {{", name));
            if nft {
                out.open("pub fn burn(env: Env, owner: Address, token_id: u32) {");
                out.line("owner.require_auth();");
                out.open("if Self::owner_of(env.clone(), token_id) != owner {");
                out.line("panic!(\"not token owner\");");
                out.close("}");
                out.line("Self::burn_token(&env, token_id);");
            } else {
                out.open("pub fn burn(env: Env, from: Address, amount: i128) {");
                out.line("from.require_auth();");
                out.line("Self::burn_from(&env, &from, amount);");
            }
            out.close("}");
            out.close("}");
        }
        Feature::Pausable => {
            out.line("#[contracttype]");
            out.line("#[derive(Clone)]");
            out.open("pub enum PausableKey {");
            out.line("Paused,");
            out.close("}");
            out.blank();
            out.line("#[contractimpl]");
            out.open(format!("impl {} {{", name));
            out.open("pub fn pause(env: Env) {");
            out.line("Self::require_admin(&env);");
            out.line("env.storage().instance().set(&PausableKey::Paused, &true);");
            out.close("}");
            out.blank();
            out.open("pub fn unpause(env: Env) {");
            out.line("Self::require_admin(&env);");
            out.line("env.storage().instance().set(&PausableKey::Paused, &false);");
            out.close("}");
            out.blank();
            out.open("pub fn paused(env: Env) -> bool {");
            out.line("env.storage().instance().get(&PausableKey::Paused).unwrap_or(false)");
            out.close("}");
            out.close("}");
        }
        Feature::Capped { max_supply } => {
            if nft {
                out.line(format!("pub const MAX_SUPPLY: u64 = {};", max_supply));
                out.blank();
                out.line("#[contractimpl]");
                out.open(format!("impl {} {{", name));
                out.open("pub fn cap(_env: Env) -> u64 {");
            } else {
                out.line(format!(
                    "pub const MAX_SUPPLY: i128 = {}i128 * 10i128.pow({});",
                    max_supply,
                    plan.decimals()
                ));
                out.blank();
                out.line("#[contractimpl]");
                out.open(format!("impl {} {{", name));
                out.open("pub fn cap(_env: Env) -> i128 {");
            }
            out.line("MAX_SUPPLY");
            out.close("}");
            out.close("}");
        }
        Feature::Whitelist => {
            out.line("#[contracttype]");
            out.line("#[derive(Clone)]");
            out.open("pub enum WhitelistKey {");
            out.line("Allowed(Address),");
            out.close("}");
            out.blank();
            out.line("#[contractimpl]");
            out.open(format!("impl {} {{", name));
            out.open("pub fn add_to_whitelist(env: Env, account: Address) {");
            out.line("Self::require_admin(&env);");
            out.line("env.storage().persistent().set(&WhitelistKey::Allowed(account), &true);");
            out.close("}");
            out.blank();
            out.open("pub fn remove_from_whitelist(env: Env, account: Address) {");
            out.line("Self::require_admin(&env);");
            out.line("env.storage().persistent().remove(&WhitelistKey::Allowed(account));");
            out.close("}");
            out.blank();
            out.open("pub fn is_whitelisted(env: Env, account: Address) -> bool {");
            out.line("env.storage()");
            out.line("    .persistent()");
            out.line("    .get(&WhitelistKey::Allowed(account))");
            out.line("    .unwrap_or(false)");
            out.close("}");
            out.close("}");
        }
        Feature::Royalty { receiver, bps } => {
            out.line(format!("pub const ROYALTY_BPS: i128 = {};", bps));
            out.blank();
            out.line("#[contracttype]");
            out.line("#[derive(Clone)]");
            out.open("pub enum RoyaltyKey {");
            out.line("Receiver,");
            out.close("}");
            out.blank();
            out.line("#[contractimpl]");
            out.open(format!("impl {} {{", name));
            out.open("pub fn royalty_info(env: Env, sale_price: i128) -> (Address, i128) {");
            out.line("let receiver: Address = env");
            out.line("    .storage()");
            out.line("    .instance()");
            out.line("    .get(&RoyaltyKey::Receiver)");
            match receiver {
                Some(addr) => out.line(format!(
                    "    .unwrap_or_else(|| Address::from_string(&String::from_str(&env, \"{}\")));",
                    addr
                )),
                None => out.line("    .unwrap_or_else(|| Self::admin(env.clone()));"),
            }
            out.line("(receiver, sale_price * ROYALTY_BPS / 10_000)");
            out.close("}");
            out.blank();
            out.open("pub fn set_royalty_receiver(env: Env, receiver: Address) {");
            out.line("Self::require_admin(&env);");
            out.line("env.storage().instance().set(&RoyaltyKey::Receiver, &receiver);");
            out.close("}");
            out.close("}");
        }
    }
}
