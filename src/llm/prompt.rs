//! System prompt assembly for code generation.
//!
//! The prompt teaches the model the builder API, shows a worked example,
//! and inserts the catalog excerpt chosen for the user's request. The
//! guidelines pin down the dialect the sandbox can execute: plain
//! declarations, loops, and builder calls — no imports, no classes, no
//! arrow functions.

/// Builder API description inserted into every system prompt.
pub const BUILDER_API: &str = "\
The LDrawBuilder API:

  const builder = new LDrawBuilder('Model Name');

  builder.addPart(partNum, color, x, y, z)
      Place a part. Optionally pass nine more numbers a,b,c,d,e,f,g,h,i
      for the row-major rotation matrix (defaults to identity).
  builder.addBrick(partNum, color, x, y, z)
  builder.addPlate(partNum, color, x, y, z)
  builder.addWheel(partNum, x, y, z)          // wheels are always black
  builder.addPartRotatedY90(partNum, color, x, y, z)
  builder.addPartRotatedX90(partNum, color, x, y, z)
  builder.addStep()                           // end a building step
  builder.setModelName(name)
  builder.setAuthor(name)
  builder.getPartCount()
  builder.save(filename)                      // finish the model

All placement methods return the builder, so calls can be chained.
Colors come from the Colors object: Colors.RED, Colors.BLUE,
Colors.BLACK, Colors.LIGHT_GRAY, Colors.YELLOW, Colors.WHITE,
Colors.TRANS_CLEAR, and so on.";

/// A small worked example shown to the model.
pub const CODE_EXAMPLE: &str = "\
const builder = new LDrawBuilder('Small Tower');
builder.setAuthor('AI Builder');

// Base plate
builder.addPlate('3020', Colors.DARK_GRAY, 0, 0, 0);
builder.addStep();

// Four brick levels, alternating colors
for (let level = 0; level < 4; level++) {
  const color = level % 2 == 0 ? Colors.RED : Colors.WHITE;
  builder.addPart('3003', color, 0, -8 - level * 24, 0);
}
builder.addStep();

// Roof tile
builder.addPart('3068', Colors.BLACK, 0, -104, 0);

builder.save('small-tower.ldr');";

/// Assembles the full system prompt for a code-generation request.
pub fn system_prompt(builder_api: &str, parts_excerpt: &str) -> String {
    format!(
        "You are a LEGO building assistant that generates code to create LEGO \
         models using the LDrawBuilder API.\n\
         DO NOT ADD ANY IMPORTS\n\
         THE CODE MUST STRICTLY FOLLOW THE EXAMPLES AND THE API SPECIFICATIONS\n\n\
         {builder_api}\n\n\
         Available parts (partial list):\n\
         {parts_excerpt}\n\n\
         Here's an example of a well-structured build with step-by-step instructions:\n\
         {CODE_EXAMPLE}\n\n\
         Important guidelines:\n\
         1. Generate ONLY executable code, no explanations\n\
         2. Use the builder methods to place parts at appropriate coordinates\n\
         3. Start with \"const builder = new LDrawBuilder();\"\n\
         4. End with \"builder.save('model.ldr');\"\n\
         DO NOT MAKE A FLOOR or GROUND\n\
         5. Use proper LDraw units (1 stud = 20 LDU, 1 plate height = 8 LDU, \
         1 brick height = 24 LDU)\n\
         6. CRITICAL: In LDraw, the Y-axis is INVERTED - negative Y values go UP, \
         positive Y values go DOWN\n\
         7. Place parts logically to create a recognizable structure\n\
         8. Use appropriate colors from the Colors object\n\
         9. Use plain for loops and arrays for repetitive elements (like wheels, \
         windows, patterns) - no arrow functions, no classes\n\
         10. Use builder.addStep() to separate major building phases for clarity\n\
         11. Return ONLY the code, no markdown or explanations"
    )
}

/// The user message wrapping the raw building request.
pub fn user_prompt(prompt: &str) -> String {
    format!("Build: {prompt}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_prompt_embeds_sections() {
        let prompt = system_prompt(BUILDER_API, "part_num,name\n3001,Brick 2 x 4");
        assert!(prompt.contains("LDrawBuilder API"));
        assert!(prompt.contains("3001,Brick 2 x 4"));
        assert!(prompt.contains("Y-axis is INVERTED"));
        assert!(prompt.contains("const builder = new LDrawBuilder('Small Tower');"));
    }

    #[test]
    fn test_user_prompt_shape() {
        assert_eq!(user_prompt("a red car"), "Build: a red car");
    }

    #[test]
    fn test_example_passes_validation() {
        assert!(crate::sandbox::filter::validate(CODE_EXAMPLE));
    }

    #[tokio::test]
    async fn test_example_is_executable_in_sandbox() {
        // The worked example must stay inside the dialect the sandbox runs.
        let sandbox = crate::sandbox::Sandbox::default();
        let model = sandbox.execute(CODE_EXAMPLE, "small-tower").await.unwrap();
        assert_eq!(model.part_count, 6);
        assert!(model.content.contains("0 Small Tower"));
    }
}
