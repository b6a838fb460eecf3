//! Text templates for the C translation unit
//!
//! The generated file plugs into the host program's functional table: a
//! header, the `Functional` registration, the `_read` hook, the energy, and
//! one routine per derivative order. Each piece starts and ends with a
//! newline so the pieces concatenate directly.

use crate::cache::DerivativeOrder;

/// C types and routine suffixes of the four derivative routines
fn derivative_signature(order: DerivativeOrder) -> (&'static str, &'static str) {
    match order.get() {
        1 => ("first", "FunFirstFuncDrv"),
        2 => ("second", "FunSecondFuncDrv"),
        3 => ("third", "FunThirdFuncDrv"),
        _ => ("fourth", "FunFourthFuncDrv"),
    }
}

/// Name of the threshold constant, e.g. `SLATER_THRESHOLD`
pub fn threshold_name(name: &str) -> String {
    format!("{}_THRESHOLD", name.to_uppercase())
}

/// License block, file banner and includes
pub fn header(name: &str, title: &str, info: &str) -> String {
    format!(
        r#"
/*
!
!  Dalton, a molecular electronic structure program
!  Copyright (C) 2020 by the authors of Dalton.
!
!  This program is free software; you can redistribute it and/or
!  modify it under the terms of the GNU Lesser General Public
!  License version 2.1 as published by the Free Software Foundation.
!
!  This program is distributed in the hope that it will be useful,
!  but WITHOUT ANY WARRANTY; without even the implied warranty of
!  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU
!  Lesser General Public License for more details.
!
!  If a copy of the GNU LGPL v2.1 was not distributed with this
!  code, you can obtain one at https://www.gnu.org/licenses/old-licenses/lgpl-2.1.en.html.
!
!
*/
/*-*-mode: C; c-indentation-style: "bsd"; c-basic-offset: 4; -*-*/
/* fun-{name}.c:
   implementation of {title} functional and its derivatives
   (c) Pawel Salek, pawsa@theochem.kth.se, aug 2001
   Z. Rinkevicius adapted for open shell systems: energy, first derivatives.
   NOTE:
   this file may seem unnecessarily complex but the structure really pays off
   when implementing multiple functionals depending on different parameters.

   Derivatives in this file generated by xcgen

{info}
*/

#include <math.h>
#include <stdio.h>
#include "general.h"

#define __CVERSION__

#include "functionals.h"
"#
    )
}

/// Prototypes and the `Functional` table entry
pub fn interface(name: &str, title: &str, gga: bool) -> String {
    format!(
        r#"
/* INTERFACE PART */
static integer {name}_isgga(void) {{ return {isgga}; }}
static integer {name}_read(const char* conf_line);
static real {name}_energy(const FunDensProp* dp);
static void {name}_first(FunFirstFuncDrv *ds,   real fac, const FunDensProp*);
static void {name}_second(FunSecondFuncDrv *ds, real fac, const FunDensProp*);
static void {name}_third(FunThirdFuncDrv *ds,   real fac, const FunDensProp*);
static void {name}_fourth(FunFourthFuncDrv *ds, real fac, const FunDensProp*);

Functional {title}Functional = {{
  "{title}",       /* name */
  {name}_isgga,   /* gga-corrected */
   3,
  {name}_read,
  NULL,
  {name}_energy,
  {name}_first,
  {name}_second,
  {name}_third,
  {name}_fourth
}};
"#,
        isgga = u8::from(gga),
    )
}

/// The `_read` hook, followed by the threshold constant when one is set
pub fn read(name: &str, threshold: Option<&str>) -> String {
    let mut out = format!(
        r#"
/* IMPLEMENTATION PART */
static integer
{name}_read(const char* conf_line)
{{
    fun_set_hf_weight(0);
    return 1;
}}
"#
    );
    if let Some(value) = threshold {
        let constant = threshold_name(name);
        out.push_str(&format!(
            r#"
/* {constant} Only to avoid numerical problems due to raising 0
 * to a fractional power. */
static const real {constant} = {value};
"#
        ));
    }
    out
}

/// Energy routine; `preamble` lands in front of the function
pub fn energy(name: &str, preamble: &str, body: &str) -> String {
    format!(
        r#"
{preamble}
static real
{name}_energy(const FunDensProp* dp)
{{
{body}}}
"#
    )
}

/// Energy body for thresholded channels: each channel contributes only
/// above the threshold
pub fn guarded_energy(name: &str, preamble: &str, alpha: &str, beta: &str) -> String {
    let constant = threshold_name(name);
    format!(
        r#"
static real
{name}_energy(const FunDensProp* dp)
{{
  real ea = 0.0, eb = 0.0;
{preamble}
  if (dp->rhoa >{constant})
      ea = {alpha};
  if (dp->rhob >{constant})
      eb = {beta};
  return ea + eb;
}}
"#
    )
}

/// One derivative routine wrapping an already indented body
pub fn derivative(name: &str, order: DerivativeOrder, body: &str) -> String {
    let (suffix, c_type) = derivative_signature(order);
    format!(
        r#"
static void
{name}_{suffix}({c_type} *ds, real factor, const FunDensProp* dp)
{{
{body}}}
"#
    )
}

/// Wrap a channel block in `if (<density> > threshold)`
///
/// A single active statement is guarded without braces, anything else gets a
/// braced block closed at the statement indentation.
pub fn guard(density: &str, constant: &str, block: &str, single_statement: bool) -> String {
    if single_statement {
        format!("  if ({density}>{constant})\n{block}")
    } else {
        format!("  if ({density}>{constant}) {{\n{block}     }}\n")
    }
}
