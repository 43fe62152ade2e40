//! Solidity emitter.
//!
//! Produces a standalone contract (no imports) targeting `^0.8.20`. The
//! skeleton owns the internal `_mint`/`_burn`/`_transfer` paths and a
//! `_beforeTokenTransfer` hook; guard lines for enabled pausable, whitelist
//! and capped blocks are placed in those internals, and each feature
//! fragment then adds its own public surface.

use blockforge_types::{BlockType, TargetLanguage};

use crate::generator::ContractEmitter;
use crate::plan::{BasePlan, ContractPlan, Feature};
use crate::writer::SourceBuf;

/// Compiler version range written into the pragma.
pub const SOLIDITY_PRAGMA: &str = "pragma solidity ^0.8.20;";

/// Emits Solidity source.
#[derive(Clone, Copy, Debug, Default)]
pub struct SolidityEmitter;

impl ContractEmitter for SolidityEmitter {
    fn target(&self) -> TargetLanguage {
        TargetLanguage::Solidity
    }

    fn emit(&self, plan: &ContractPlan) -> String {
        let mut out = SourceBuf::new();
        let name = &plan.contract_name;

        out.line("// SPDX-License-Identifier: MIT");
        out.line(SOLIDITY_PRAGMA);
        out.blank();
        out.line(format!("/// @title {}", name));
        out.line("/// @notice Generated by Blockforge.");
        out.open(format!("contract {} {{", name));

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
            feature_fragment(&mut out, plan, feature);
        }

        out.close("}");
        out.finish()
    }
}

// ── Shared Pieces ──────────────────────────────────────────────────────

fn ownership(out: &mut SourceBuf, name: &str) {
    out.open("modifier onlyOwner() {");
    out.line(format!(
        "require(msg.sender == owner, \"{}: caller is not the owner\");",
        name
    ));
    out.line("_;");
    out.close("}");
}

fn transfer_ownership(out: &mut SourceBuf, name: &str) {
    out.open("function transferOwnership(address newOwner) public onlyOwner {");
    out.line(format!(
        "require(newOwner != address(0), \"{}: new owner is the zero address\");",
        name
    ));
    out.line("emit OwnershipTransferred(owner, newOwner);");
    out.line("owner = newOwner;");
    out.close("}");
}

/// `_beforeTokenTransfer` with guard lines for the enabled guard features.
fn transfer_hook(out: &mut SourceBuf, plan: &ContractPlan) {
    let name = &plan.contract_name;
    let pausable = plan.has(BlockType::Pausable);
    let whitelist = plan.has(BlockType::Whitelist);

    if !pausable && !whitelist {
        out.line("function _beforeTokenTransfer(address, address, uint256) internal pure {}");
        return;
    }

    let to = if whitelist { "address to" } else { "address" };
    out.open(format!(
        "function _beforeTokenTransfer(address, {}, uint256) internal view {{",
        to
    ));
    if pausable {
        out.line(format!(
            "require(!paused, \"{}: token transfer while paused\");",
            name
        ));
    }
    if whitelist {
        out.line(format!(
            "require(to == address(0) || whitelisted[to], \"{}: recipient not whitelisted\");",
            name
        ));
    }
    out.close("}");
}

// ── Fungible Token Skeleton ────────────────────────────────────────────

fn token_skeleton(out: &mut SourceBuf, plan: &ContractPlan, decimals: u8, initial_supply: u64) {
    let name = &plan.contract_name;

    out.line("string public name;");
    out.line("string public symbol;");
    out.line(format!("uint8 public constant decimals = {};", decimals));
    out.line("uint256 public totalSupply;");
    out.line("address public owner;");
    out.blank();
    out.line("mapping(address => uint256) public balanceOf;");
    out.line("mapping(address => mapping(address => uint256)) public allowance;");
    out.blank();
    out.line("event Transfer(address indexed from, address indexed to, uint256 value);");
    out.line("event Approval(address indexed holder, address indexed spender, uint256 value);");
    out.line(
        "event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);",
    );
    out.blank();
    ownership(out, name);
    out.blank();

    out.open("constructor() {");
    out.line(format!("name = \"{}\";", name));
    out.line(format!("symbol = \"{}\";", plan.symbol));
    out.line("owner = msg.sender;");
    out.line("emit OwnershipTransferred(address(0), msg.sender);");
    if plan.has(BlockType::Whitelist) {
        out.line("whitelisted[msg.sender] = true;");
    }
    if initial_supply > 0 {
        out.line(format!(
            "_mint(msg.sender, {} * 10 ** uint256(decimals));",
            initial_supply
        ));
    }
    out.close("}");
    out.blank();

    out.open("function transfer(address to, uint256 amount) public returns (bool) {");
    out.line("_transfer(msg.sender, to, amount);");
    out.line("return true;");
    out.close("}");
    out.blank();

    out.open("function approve(address spender, uint256 amount) public returns (bool) {");
    out.line("allowance[msg.sender][spender] = amount;");
    out.line("emit Approval(msg.sender, spender, amount);");
    out.line("return true;");
    out.close("}");
    out.blank();

    out.open(
        "function transferFrom(address from, address to, uint256 amount) public returns (bool) {",
    );
    out.line("uint256 allowed = allowance[from][msg.sender];");
    out.line(format!(
        "require(allowed >= amount, \"{}: insufficient allowance\");",
        name
    ));
    out.open("if (allowed != type(uint256).max) {");
    out.line("allowance[from][msg.sender] = allowed - amount;");
    out.close("}");
    out.line("_transfer(from, to, amount);");
    out.line("return true;");
    out.close("}");
    out.blank();

    transfer_ownership(out, name);
    out.blank();

    out.open("function _transfer(address from, address to, uint256 amount) internal {");
    out.line(format!(
        "require(to != address(0), \"{}: transfer to the zero address\");",
        name
    ));
    out.line("_beforeTokenTransfer(from, to, amount);");
    out.line("uint256 fromBalance = balanceOf[from];");
    out.line(format!(
        "require(fromBalance >= amount, \"{}: transfer amount exceeds balance\");",
        name
    ));
    out.open("unchecked {");
    out.line("balanceOf[from] = fromBalance - amount;");
    out.close("}");
    out.line("balanceOf[to] += amount;");
    out.line("emit Transfer(from, to, amount);");
    out.close("}");
    out.blank();

    out.open("function _mint(address to, uint256 amount) internal {");
    out.line(format!(
        "require(to != address(0), \"{}: mint to the zero address\");",
        name
    ));
    out.line("_beforeTokenTransfer(address(0), to, amount);");
    if plan.max_supply().is_some() {
        out.line(format!(
            "require(totalSupply + amount <= MAX_SUPPLY, \"{}: cap exceeded\");",
            name
        ));
    }
    out.line("totalSupply += amount;");
    out.line("balanceOf[to] += amount;");
    out.line("emit Transfer(address(0), to, amount);");
    out.close("}");
    out.blank();

    out.open("function _burn(address from, uint256 amount) internal {");
    out.line("_beforeTokenTransfer(from, address(0), amount);");
    out.line("uint256 fromBalance = balanceOf[from];");
    out.line(format!(
        "require(fromBalance >= amount, \"{}: burn amount exceeds balance\");",
        name
    ));
    out.open("unchecked {");
    out.line("balanceOf[from] = fromBalance - amount;");
    out.line("totalSupply -= amount;");
    out.close("}");
    out.line("emit Transfer(from, address(0), amount);");
    out.close("}");
    out.blank();

    transfer_hook(out, plan);
}

// ── NFT Skeleton ───────────────────────────────────────────────────────

fn nft_skeleton(out: &mut SourceBuf, plan: &ContractPlan, base_uri: &str) {
    let name = &plan.contract_name;

    out.line("string public name;");
    out.line("string public symbol;");
    out.line("string public baseURI;");
    out.line("uint256 public totalSupply;");
    out.line("uint256 public nextTokenId;");
    out.line("address public owner;");
    out.blank();
    out.line("mapping(uint256 => address) private _owners;");
    out.line("mapping(address => uint256) public balanceOf;");
    out.line("mapping(uint256 => address) public getApproved;");
    out.line("mapping(address => mapping(address => bool)) public isApprovedForAll;");
    out.blank();
    out.line("event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);");
    out.line(
        "event Approval(address indexed holder, address indexed approved, uint256 indexed tokenId);",
    );
    out.line(
        "event ApprovalForAll(address indexed holder, address indexed operator, bool approved);",
    );
    out.line(
        "event OwnershipTransferred(address indexed previousOwner, address indexed newOwner);",
    );
    out.blank();
    ownership(out, name);
    out.blank();

    out.open("constructor() {");
    out.line(format!("name = \"{}\";", name));
    out.line(format!("symbol = \"{}\";", plan.symbol));
    out.line(format!("baseURI = \"{}\";", base_uri));
    out.line("owner = msg.sender;");
    out.line("emit OwnershipTransferred(address(0), msg.sender);");
    if plan.has(BlockType::Whitelist) {
        out.line("whitelisted[msg.sender] = true;");
    }
    out.close("}");
    out.blank();

    out.open("function ownerOf(uint256 tokenId) public view returns (address) {");
    out.line("address tokenOwner = _owners[tokenId];");
    out.line(format!(
        "require(tokenOwner != address(0), \"{}: nonexistent token\");",
        name
    ));
    out.line("return tokenOwner;");
    out.close("}");
    out.blank();

    out.open("function tokenURI(uint256 tokenId) public view returns (string memory) {");
    out.line("ownerOf(tokenId);");
    out.line("return string(abi.encodePacked(baseURI, _toString(tokenId)));");
    out.close("}");
    out.blank();

    out.open("function approve(address to, uint256 tokenId) public {");
    out.line("address tokenOwner = ownerOf(tokenId);");
    out.line(format!(
        "require(msg.sender == tokenOwner || isApprovedForAll[tokenOwner][msg.sender], \"{}: not authorized\");",
        name
    ));
    out.line("getApproved[tokenId] = to;");
    out.line("emit Approval(tokenOwner, to, tokenId);");
    out.close("}");
    out.blank();

    out.open("function setApprovalForAll(address operator, bool approved) public {");
    out.line("isApprovedForAll[msg.sender][operator] = approved;");
    out.line("emit ApprovalForAll(msg.sender, operator, approved);");
    out.close("}");
    out.blank();

    out.open("function transferFrom(address from, address to, uint256 tokenId) public {");
    out.line("address tokenOwner = ownerOf(tokenId);");
    out.line(format!(
        "require(tokenOwner == from, \"{}: transfer from incorrect owner\");",
        name
    ));
    out.line(format!(
        "require(msg.sender == from || getApproved[tokenId] == msg.sender || isApprovedForAll[from][msg.sender], \"{}: not authorized\");",
        name
    ));
    out.line(format!(
        "require(to != address(0), \"{}: transfer to the zero address\");",
        name
    ));
    out.line("_beforeTokenTransfer(from, to, tokenId);");
    out.line("delete getApproved[tokenId];");
    out.line("balanceOf[from] -= 1;");
    out.line("balanceOf[to] += 1;");
    out.line("_owners[tokenId] = to;");
    out.line("emit Transfer(from, to, tokenId);");
    out.close("}");
    out.blank();

    transfer_ownership(out, name);
    out.blank();

    out.open("function _mint(address to) internal returns (uint256 tokenId) {");
    out.line(format!(
        "require(to != address(0), \"{}: mint to the zero address\");",
        name
    ));
    if plan.max_supply().is_some() {
        out.line(format!(
            "require(totalSupply < MAX_SUPPLY, \"{}: cap exceeded\");",
            name
        ));
    }
    out.line("tokenId = nextTokenId;");
    out.line("_beforeTokenTransfer(address(0), to, tokenId);");
    out.line("nextTokenId += 1;");
    out.line("totalSupply += 1;");
    out.line("balanceOf[to] += 1;");
    out.line("_owners[tokenId] = to;");
    out.line("emit Transfer(address(0), to, tokenId);");
    out.close("}");
    out.blank();

    out.open("function _burn(uint256 tokenId) internal {");
    out.line("address tokenOwner = ownerOf(tokenId);");
    out.line("_beforeTokenTransfer(tokenOwner, address(0), tokenId);");
    out.line("delete getApproved[tokenId];");
    out.line("balanceOf[tokenOwner] -= 1;");
    out.line("totalSupply -= 1;");
    out.line("delete _owners[tokenId];");
    out.line("emit Transfer(tokenOwner, address(0), tokenId);");
    out.close("}");
    out.blank();

    transfer_hook(out, plan);
    out.blank();

    out.open("function _toString(uint256 value) internal pure returns (string memory) {");
    out.open("if (value == 0) {");
    out.line("return \"0\";");
    out.close("}");
    out.line("uint256 temp = value;");
    out.line("uint256 digits;");
    out.open("while (temp != 0) {");
    out.line("digits++;");
    out.line("temp /= 10;");
    out.close("}");
    out.line("bytes memory buffer = new bytes(digits);");
    out.open("while (value != 0) {");
    out.line("digits -= 1;");
    out.line("buffer[digits] = bytes1(uint8(48 + uint256(value % 10)));");
    out.line("value /= 10;");
    out.close("}");
    out.line("return string(buffer);");
    out.close("}");
}

// ── Feature Fragments ──────────────────────────────────────────────────

fn feature_fragment(out: &mut SourceBuf, plan: &ContractPlan, feature: &Feature) {
    let name = &plan.contract_name;
    let nft = plan.is_nft();

    match feature {
        Feature::Mint if nft => {
            out.open("function mint(address to) public onlyOwner returns (uint256) {");
            out.line("return _mint(to);");
            out.close("}");
        }
        Feature::Mint => {
            out.open("function mint(address to, uint256 amount) public onlyOwner {");
            out.line("_mint(to, amount);");
            out.close("}");
        }
        Feature::Burn if nft => {
            out.open("function burn(uint256 tokenId) public {");
            out.line("address tokenOwner = ownerOf(tokenId);");
            out.line(format!(
                "require(msg.sender == tokenOwner || getApproved[tokenId] == msg.sender || isApprovedForAll[tokenOwner][msg.sender], \"{}: not authorized\");",
                name
            ));
            out.line("_burn(tokenId);");
            out.close("}");
        }
        Feature::Burn => {
            out.open("function burn(uint256 amount) public {");
            out.line("_burn(msg.sender, amount);");
            out.close("}");
        }
        Feature::Pausable => {
            out.line("bool public paused;");
            out.blank();
            out.line("event Paused(address account);");
            out.line("event Unpaused(address account);");
            out.blank();
            out.open("function pause() public onlyOwner {");
            out.line(format!("require(!paused, \"{}: already paused\");", name));
            out.line("paused = true;");
            out.line("emit Paused(msg.sender);");
            out.close("}");
            out.blank();
            out.open("function unpause() public onlyOwner {");
            out.line(format!("require(paused, \"{}: not paused\");", name));
            out.line("paused = false;");
            out.line("emit Unpaused(msg.sender);");
            out.close("}");
        }
        Feature::Capped { max_supply } => {
            if nft {
                out.line(format!("uint256 public constant MAX_SUPPLY = {};", max_supply));
            } else {
                out.line(format!(
                    "uint256 public constant MAX_SUPPLY = {} * 10 ** {};",
                    max_supply,
                    plan.decimals()
                ));
            }
            out.blank();
            out.open("function cap() public pure returns (uint256) {");
            out.line("return MAX_SUPPLY;");
            out.close("}");
        }
        Feature::Whitelist => {
            out.line("mapping(address => bool) public whitelisted;");
            out.blank();
            out.line("event WhitelistUpdated(address indexed account, bool allowed);");
            out.blank();
            out.open("function addToWhitelist(address account) public onlyOwner {");
            out.line("whitelisted[account] = true;");
            out.line("emit WhitelistUpdated(account, true);");
            out.close("}");
            out.blank();
            out.open("function removeFromWhitelist(address account) public onlyOwner {");
            out.line("whitelisted[account] = false;");
            out.line("emit WhitelistUpdated(account, false);");
            out.close("}");
        }
        Feature::Royalty { receiver, bps } => {
            match receiver {
                Some(addr) => out.line(format!("address public royaltyReceiver = {};", addr)),
                None => out.line("address public royaltyReceiver;"),
            }
            out.line(format!("uint256 public constant ROYALTY_BPS = {};", bps));
            out.blank();
            out.open(
                "function royaltyInfo(uint256, uint256 salePrice) public view returns (address receiver, uint256 royaltyAmount) {",
            );
            out.line("receiver = royaltyReceiver == address(0) ? owner : royaltyReceiver;");
            out.line("royaltyAmount = (salePrice * ROYALTY_BPS) / 10000;");
            out.close("}");
            out.blank();
            out.open("function setRoyaltyReceiver(address newReceiver) public onlyOwner {");
            out.line("royaltyReceiver = newReceiver;");
            out.close("}");
        }
    }
}
